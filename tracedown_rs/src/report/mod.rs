//! Markdown writers.
//!
//! Every writer is a pure function from the ingested model (plus the asset
//! map) to one file's contents. Nothing here touches the filesystem; the
//! exporter decides where the strings land.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::assets::AssetMap;
use crate::tree::{ActionTree, StepSnapshots};
use crate::types::{StackFrame, Trace};

mod attachments;
mod console;
mod errors;
mod filmstrip;
mod index;
mod metadata;
mod network;
mod timeline;

pub use attachments::render_attachments;
pub use console::render_console;
pub use errors::render_errors;
pub use filmstrip::render_filmstrip;
pub use index::{render_index, render_readme};
pub use metadata::render_metadata;
pub use network::render_network;
pub use timeline::render_timeline;

/// Everything a writer may need. Built once per export.
pub struct ReportContext<'a> {
    pub trace: &'a Trace,
    pub tree: &'a ActionTree,
    pub assets: &'a AssetMap,
    /// stepId -> snapshots recorded by the API actions of that step.
    pub step_snapshots: &'a HashMap<String, StepSnapshots>,
    /// Snapshot name -> path (relative to the output root) of its HTML page.
    pub snapshot_pages: &'a HashMap<String, String>,
    /// Input archive file name, used as a title fallback.
    pub archive_name: String,
}

/// One surfaced error: either an action's failure or a global page error.
pub struct ErrorEntry {
    pub message: String,
    pub stack: Option<String>,
}

/// Action errors (in action order) followed by global errors.
pub fn collect_errors(trace: &Trace) -> Vec<ErrorEntry> {
    let mut out = Vec::new();
    for action in &trace.actions {
        if let Some(error) = &action.error {
            out.push(ErrorEntry {
                message: error.message.clone(),
                stack: error.stack.clone(),
            });
        }
    }
    for error in &trace.errors {
        let stack = format_stack_frames(&error.stack);
        out.push(ErrorEntry {
            message: error.message.clone(),
            stack: (!stack.is_empty()).then_some(stack),
        });
    }
    out
}

pub(crate) fn format_stack_frames(frames: &[StackFrame]) -> String {
    frames
        .iter()
        .map(|frame| {
            let mut line = format!("at {}", frame.file);
            if let Some(l) = frame.line {
                line.push_str(&format!(":{l}"));
                if let Some(c) = frame.column {
                    line.push_str(&format!(":{c}"));
                }
            }
            if let Some(function) = &frame.function {
                line.push_str(&format!(" ({function})"));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// First `file:line` in the recorded stack, the conventional "source" of an
/// action.
pub(crate) fn source_location(frames: &[StackFrame]) -> Option<String> {
    let frame = frames.first()?;
    if frame.file.is_empty() {
        return None;
    }
    Some(match frame.line {
        Some(line) => format!("{}:{line}", frame.file),
        None => frame.file.clone(),
    })
}

// --- Text helpers ---

fn regex_ansi() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").expect("valid regex literal"))
}

/// Remove ANSI color escapes from recorder-produced error text.
pub(crate) fn strip_ansi(text: &str) -> String {
    regex_ansi().replace_all(text, "").into_owned()
}

/// Collapse to a single line and cap the length; table cells must not grow
/// unbounded when a page logs a megabyte of text.
pub(crate) fn table_cell(text: &str, max_chars: usize) -> String {
    let single_line = strip_ansi(text).replace(['\n', '\r'], " ");
    escape_pipes(&truncate_chars(&single_line, max_chars))
}

pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{head}...")
}

pub(crate) fn escape_pipes(text: &str) -> String {
    text.replace('|', "\\|")
}

/// GitHub-style heading anchor: lowercase, drop everything that is not a
/// word character / whitespace / hyphen, then turn each whitespace character
/// into a hyphen. Runs are deliberately not collapsed.
pub fn generate_anchor(heading: &str) -> String {
    heading
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect()
}

/// `123ms` below one second, `1.23s` above.
pub(crate) fn format_duration_ms(ms: f64) -> String {
    let ms = ms.max(0.0);
    if ms < 1000.0 {
        format!("{}ms", ms.round() as i64)
    } else {
        format!("{:.2}s", ms / 1000.0)
    }
}

/// Offset from trace start, e.g. `+1.23s`.
pub(crate) fn format_relative_ms(time: f64, start: f64) -> String {
    format!("+{:.2}s", (time - start).max(0.0) / 1000.0)
}
