//! Environment and timing tables (`metadata.md`).

use chrono::{DateTime, Utc};

use super::{ReportContext, format_duration_ms, table_cell};

pub fn render_metadata(ctx: &ReportContext<'_>) -> String {
    let trace = ctx.trace;
    let options = &trace.options;

    let mut out = String::new();
    out.push_str("# Metadata\n\n");

    out.push_str("## Environment\n\n| Field | Value |\n|---|---|\n");
    let environment = [
        ("Browser", some_or_dash(Some(trace.browser_name.as_str()))),
        ("Channel", some_or_dash(trace.channel.as_deref())),
        ("Platform", some_or_dash(trace.platform.as_deref())),
        ("SDK language", some_or_dash(trace.sdk_language.as_deref())),
        ("Trace version", some_or_dash(trace.version.as_deref())),
    ];
    for (field, value) in environment {
        out.push_str(&format!("| {field} | {} |\n", table_cell(&value, 120)));
    }

    out.push_str("\n## Context Options\n\n| Field | Value |\n|---|---|\n");
    let viewport = options
        .viewport
        .map(|v| format!("{}x{}", v.width, v.height));
    let scale = options.device_scale_factor.map(|s| s.to_string());
    let context = [
        ("Viewport", some_or_dash(viewport.as_deref())),
        ("Device scale factor", some_or_dash(scale.as_deref())),
        ("Mobile", if options.is_mobile { "yes" } else { "no" }.to_string()),
        ("User agent", some_or_dash(options.user_agent.as_deref())),
        ("Base URL", some_or_dash(options.base_url.as_deref())),
    ];
    for (field, value) in context {
        out.push_str(&format!("| {field} | {} |\n", table_cell(&value, 200)));
    }

    out.push_str("\n## Timing\n\n| Field | Value |\n|---|---|\n");
    let started = trace
        .wall_time
        .and_then(|ms| DateTime::<Utc>::from_timestamp_millis(ms as i64))
        .map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string());
    let timing = [
        ("Started", some_or_dash(started.as_deref())),
        ("Duration", format_duration_ms(trace.duration_ms())),
        ("Monotonic start", format!("{:.1}ms", trace.start_time)),
        ("Monotonic end", format!("{:.1}ms", trace.end_time)),
    ];
    for (field, value) in timing {
        out.push_str(&format!("| {field} | {value} |\n"));
    }
    out
}

fn some_or_dash(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => "-".to_string(),
    }
}
