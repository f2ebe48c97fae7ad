//! Timeline of user-level test steps (`timeline.md`).
//!
//! Only class `"Test"` actions appear, in tree order, with heading depth
//! following nesting (capped at Markdown's six levels). API-level actions
//! stay invisible but lend their snapshots to the step that caused them.

use serde_json::Value;

use super::{
    ReportContext, format_duration_ms, format_relative_ms, generate_anchor, source_location,
    strip_ansi,
};
use crate::types::{Action, INTERNAL_GROUP};

pub fn render_timeline(ctx: &ReportContext<'_>) -> String {
    let trace = ctx.trace;
    let steps = ctx.tree.test_steps(&trace.actions);

    let mut out = String::new();
    out.push_str("# Timeline\n\n");
    out.push_str(&format!("Total actions: {}\n", trace.actions.len()));

    if steps.is_empty() {
        return out;
    }

    // Headings first, so the table of contents can link to them.
    let headings: Vec<String> = steps
        .iter()
        .enumerate()
        .map(|(n, (index, _))| format!("{}. {}", n + 1, trace.actions[*index].label()))
        .collect();

    out.push_str("\n## Table of Contents\n\n");
    for ((_, depth), heading) in steps.iter().zip(&headings) {
        let indent = "  ".repeat(*depth);
        out.push_str(&format!(
            "{indent}- [{heading}](#{})\n",
            generate_anchor(heading)
        ));
    }

    for ((index, depth), heading) in steps.iter().zip(&headings) {
        let action = &trace.actions[*index];
        let level = (2 + depth).min(6);
        out.push('\n');
        out.push_str(&"#".repeat(level));
        out.push(' ');
        out.push_str(heading);
        out.push_str("\n\n");
        render_step(ctx, action, &mut out);
    }
    out
}

fn render_step(ctx: &ReportContext<'_>, action: &Action, out: &mut String) {
    let trace = ctx.trace;
    out.push_str(&format!(
        "**Time:** {} · **Duration:** {}\n\n",
        format_relative_ms(action.start_time, trace.start_time),
        format_duration_ms(action.duration_ms())
    ));

    if action.group.as_deref() != Some(INTERNAL_GROUP) && !params_empty(&action.params) {
        out.push_str("**Parameters:**\n\n```json\n");
        out.push_str(&pretty_json(&action.params));
        out.push_str("\n```\n\n");
    }

    if let Some(result) = &action.result {
        if !params_empty(result) {
            out.push_str("**Result:**\n\n```json\n");
            out.push_str(&pretty_json(result));
            out.push_str("\n```\n\n");
        }
    }

    if let Some(source) = source_location(&action.stack) {
        out.push_str(&format!("**Source:** `{source}`\n\n"));
    }

    let snapshots = snapshot_links(ctx, action);
    if !snapshots.is_empty() {
        out.push_str(&format!("**Snapshots:** {}\n\n", snapshots.join(" · ")));
    }

    let mut attachment_links = Vec::new();
    for attachment in &action.attachments {
        if let Some(link) = attachment
            .sha1
            .as_deref()
            .and_then(|sha1| ctx.assets.link(sha1))
        {
            attachment_links.push(format!("[{}]({link})", attachment.name));
        } else {
            attachment_links.push(attachment.name.clone());
        }
    }
    if !attachment_links.is_empty() {
        out.push_str(&format!(
            "**Attachments:** {}\n\n",
            attachment_links.join(" · ")
        ));
    }

    if !action.log.is_empty() {
        out.push_str("<details>\n<summary>Log</summary>\n\n");
        for entry in &action.log {
            out.push_str(&format!(
                "- [{}] {}\n",
                format_relative_ms(entry.time, trace.start_time),
                strip_ansi(&entry.message)
            ));
        }
        out.push_str("\n</details>\n\n");
    }

    if let Some(error) = &action.error {
        out.push_str(&format!("**Error:** {}\n\n", strip_ansi(&error.message)));
        if let Some(stack) = &error.stack {
            out.push_str("<details>\n<summary>Stack</summary>\n\n```\n");
            out.push_str(&strip_ansi(stack));
            out.push_str("\n```\n\n</details>\n\n");
        }
    }
}

/// Snapshot links for a step: its own snapshot names first, then whatever its
/// API actions recorded against this step's id.
fn snapshot_links(ctx: &ReportContext<'_>, action: &Action) -> Vec<String> {
    let inherited = ctx.step_snapshots.get(&action.call_id);
    let before = action
        .before_snapshot
        .clone()
        .or_else(|| inherited.and_then(|s| s.before.clone()));
    let after = action
        .after_snapshot
        .clone()
        .or_else(|| inherited.and_then(|s| s.after.clone()));

    let mut links = Vec::new();
    for (label, name) in [("before", before), ("after", after)] {
        let Some(name) = name else { continue };
        if let Some(page) = ctx.snapshot_pages.get(&name) {
            links.push(format!("[{label}](./{page})"));
        }
    }
    links
}

fn params_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
