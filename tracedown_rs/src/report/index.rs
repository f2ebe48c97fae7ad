//! Top-level summary (`index.md`) and the export's own `README.md`.

use super::{
    ReportContext, collect_errors, format_duration_ms, source_location, strip_ansi, truncate_chars,
};

const MAX_LISTED_ERRORS: usize = 10;
const MAX_ERROR_CHARS: usize = 200;

pub fn render_index(ctx: &ReportContext<'_>) -> String {
    let trace = ctx.trace;
    let errors = collect_errors(trace);
    let status = if errors.is_empty() { "PASSED" } else { "FAILED" };

    let title = trace
        .title
        .clone()
        .or_else(|| {
            trace
                .actions
                .iter()
                .find(|a| a.is_test_step())
                .map(|a| a.label().to_string())
        })
        .unwrap_or_else(|| ctx.archive_name.clone());
    let path = trace
        .actions
        .iter()
        .find_map(|a| source_location(&a.stack))
        .unwrap_or_else(|| "-".to_string());
    let viewport = trace
        .options
        .viewport
        .map(|v| format!("{}x{}", v.width, v.height))
        .unwrap_or_else(|| "-".to_string());

    let mut out = String::new();
    out.push_str(&format!("# {title}\n\n"));
    out.push_str(&format!("**Test:** {title}\n\n"));
    out.push_str(&format!("**Path:** {path}\n\n"));
    out.push_str(&format!("**Status:** {status}\n\n"));
    out.push_str(&format!(
        "**Duration:** {}\n\n",
        format_duration_ms(trace.duration_ms())
    ));
    out.push_str(&format!("**Viewport:** {viewport}\n\n"));
    out.push_str(&format!("**Actions:** {}\n\n", trace.actions.len()));
    out.push_str(&format!("**Errors:** {}\n", errors.len()));

    if !errors.is_empty() {
        out.push_str("\n## Errors\n\n");
        for entry in errors.iter().take(MAX_LISTED_ERRORS) {
            let message = truncate_chars(&strip_ansi(&entry.message), MAX_ERROR_CHARS)
                .replace(['\n', '\r'], " ");
            out.push_str(&format!("- {message}\n"));
        }
        if errors.len() > MAX_LISTED_ERRORS {
            out.push_str(&format!(
                "- ... and {} more (see [errors.md](./errors.md))\n",
                errors.len() - MAX_LISTED_ERRORS
            ));
        }
    }
    out
}

pub fn render_readme(ctx: &ReportContext<'_>) -> String {
    format!(
        "# Trace export: {name}\n\n\
         This directory is a self-contained export of a recorded browser-automation\n\
         trace. Start with [index.md](./index.md).\n\n\
         | File | Contents |\n\
         |---|---|\n\
         | [index.md](./index.md) | Pass/fail summary |\n\
         | [metadata.md](./metadata.md) | Environment, context options, timing |\n\
         | [timeline.md](./timeline.md) | Test steps with parameters, logs and snapshot links |\n\
         | [errors.md](./errors.md) | Action and page errors with stacks |\n\
         | [console.md](./console.md) | Console messages |\n\
         | [network.md](./network.md) | Network requests and failures |\n\
         | [filmstrip.md](./filmstrip.md) | Screencast frames in time order |\n\
         | [attachments.md](./attachments.md) | Files attached by the test |\n\n\
         ## Snapshots\n\n\
         `assets/snapshots/` holds one HTML document per captured DOM snapshot.\n\
         They reference extracted resources relatively, so serve the whole export\n\
         directory over any static HTTP server and open a snapshot in a browser to\n\
         reproduce the page state at recording time. Opening the files directly\n\
         also works for snapshots without subresources.\n",
        name = ctx.archive_name
    )
}
