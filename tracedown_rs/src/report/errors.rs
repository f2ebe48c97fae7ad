//! Error report (`errors.md`): action failures plus global page errors.

use super::{ReportContext, collect_errors, strip_ansi};

pub fn render_errors(ctx: &ReportContext<'_>) -> String {
    let errors = collect_errors(ctx.trace);

    let mut out = String::new();
    out.push_str("# Errors\n\n");
    out.push_str(&format!("Total errors: {}\n", errors.len()));

    for (n, entry) in errors.iter().enumerate() {
        out.push_str(&format!("\n## Error {}\n\n", n + 1));
        out.push_str(&strip_ansi(&entry.message));
        out.push('\n');
        if let Some(stack) = &entry.stack {
            out.push_str("\n<details>\n<summary>Stack</summary>\n\n```\n");
            out.push_str(&strip_ansi(stack));
            out.push_str("\n```\n\n</details>\n");
        }
    }
    out
}
