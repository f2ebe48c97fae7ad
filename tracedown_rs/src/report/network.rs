//! Network report (`network.md`): request table plus failed-request details.

use super::{ReportContext, table_cell, truncate_chars};
use crate::types::NetworkResource;

const MAX_URL_CHARS: usize = 160;
const MAX_BODY_CHARS: usize = 2000;

pub fn render_network(ctx: &ReportContext<'_>) -> String {
    let resources = &ctx.trace.resources;

    let mut out = String::new();
    out.push_str("# Network\n\n");
    out.push_str(&format!("Total requests: {}\n", resources.len()));
    if resources.is_empty() {
        return out;
    }

    out.push_str("\n| Method | URL | Status | Type | Size | Body |\n|---|---|---|---|---|---|\n");
    for resource in resources {
        let body = resource
            .sha1
            .as_deref()
            .and_then(|sha1| ctx.assets.link(sha1))
            .map(|link| format!("[view]({link})"))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            table_cell(&resource.method, 12),
            table_cell(&resource.url, MAX_URL_CHARS),
            resource.status,
            table_cell(resource.content_type.as_deref().unwrap_or("-"), 60),
            resource
                .size
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string()),
            body,
        ));
    }

    let failed: Vec<&NetworkResource> = resources.iter().filter(|r| r.status >= 400).collect();
    if !failed.is_empty() {
        out.push_str("\n## Failed Requests\n");
        for resource in failed {
            out.push_str(&format!(
                "\n### {} {} ({})\n",
                resource.method, resource.url, resource.status
            ));
            if let Some(failure) = &resource.failure {
                out.push_str(&format!("\nFailure: {failure}\n"));
            }
            if let Some(text) = &resource.text {
                out.push_str("\n<details>\n<summary>Response body</summary>\n\n```\n");
                out.push_str(&truncate_chars(text, MAX_BODY_CHARS));
                out.push_str("\n```\n\n</details>\n");
            }
        }
    }
    out
}
