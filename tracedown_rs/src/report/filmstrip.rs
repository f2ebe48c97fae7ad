//! Screencast filmstrip (`filmstrip.md`): every frame of every page, merged
//! and sorted globally by timestamp.

use super::{ReportContext, format_relative_ms};

pub fn render_filmstrip(ctx: &ReportContext<'_>) -> String {
    let trace = ctx.trace;
    let mut frames: Vec<(&str, &crate::types::ScreencastFrame)> = trace
        .pages
        .iter()
        .flat_map(|page| page.frames.iter().map(move |f| (page.page_id.as_str(), f)))
        .collect();
    frames.sort_by(|a, b| a.1.timestamp.total_cmp(&b.1.timestamp));

    let mut out = String::new();
    out.push_str("# Filmstrip\n\n");
    out.push_str(&format!("Total screenshots: {}\n", frames.len()));
    if frames.is_empty() {
        return out;
    }

    out.push_str("\n| # | Time | Page | Screenshot |\n|---|---|---|---|\n");
    for (n, (page_id, frame)) in frames.iter().enumerate() {
        let link = ctx
            .assets
            .link(&frame.sha1)
            .map(|link| format!("[view]({link})"))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            n + 1,
            format_relative_ms(frame.timestamp, trace.start_time),
            page_id,
            link,
        ));
    }
    out
}
