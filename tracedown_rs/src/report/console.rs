//! Console log table (`console.md`).

use super::{ReportContext, format_relative_ms, table_cell};

const MAX_MESSAGE_CHARS: usize = 300;
const MAX_LOCATION_CHARS: usize = 120;

pub fn render_console(ctx: &ReportContext<'_>) -> String {
    let trace = ctx.trace;

    let mut out = String::new();
    out.push_str("# Console\n\n");
    out.push_str(&format!("Total messages: {}\n", trace.console.len()));
    if trace.console.is_empty() {
        return out;
    }

    out.push_str("\n| Time | Type | Message | Location |\n|---|---|---|---|\n");
    for event in &trace.console {
        let location = event
            .location
            .as_ref()
            .map(|l| format!("{}:{}:{}", l.url, l.line_number, l.column_number))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            format_relative_ms(event.time, trace.start_time),
            table_cell(&event.message_type, 24),
            table_cell(&event.text, MAX_MESSAGE_CHARS),
            table_cell(&location, MAX_LOCATION_CHARS),
        ));
    }
    out
}
