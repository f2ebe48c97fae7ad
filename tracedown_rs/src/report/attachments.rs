//! Attachment inventory (`attachments.md`), linking friendly-named files.

use super::{ReportContext, table_cell};

pub fn render_attachments(ctx: &ReportContext<'_>) -> String {
    let trace = ctx.trace;
    let mut rows = Vec::new();
    for action in &trace.actions {
        for attachment in &action.attachments {
            rows.push((action.label().to_string(), attachment));
        }
    }

    let mut out = String::new();
    out.push_str("# Attachments\n\n");
    out.push_str(&format!("Total attachments: {}\n", rows.len()));
    if rows.is_empty() {
        return out;
    }

    out.push_str("\n| Action | Name | Content Type | File |\n|---|---|---|---|\n");
    for (label, attachment) in rows {
        let file = attachment
            .sha1
            .as_deref()
            .and_then(|sha1| ctx.assets.link(sha1))
            .map(|link| format!("[{}]({link})", table_cell(&attachment.name, 80)))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            table_cell(&label, 80),
            table_cell(&attachment.name, 80),
            table_cell(&attachment.content_type, 60),
            file,
        ));
    }
    out
}
