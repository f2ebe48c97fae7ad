//! Event ingestion: NDJSON logs -> [`Trace`] model.
//!
//! Every archive entry ending in `.trace` or `.network` is split on newlines
//! and each nonempty line parsed as one JSON event. Events dispatch on their
//! `type` field; unknown types and malformed lines are dropped silently,
//! because live recorders routinely truncate or corrupt the tail of a log.

use std::collections::HashMap;

use anyhow::{Result, bail};
use serde::Deserialize;
use serde_json::Value;

use crate::archive::TraceArchive;
use crate::types::{
    Action, ActionError, Attachment, ConsoleEvent, ContextOptions, DomNode, FrameSnapshot,
    GlobalError, LogEntry, NetworkResource, Page, ResourceOverride, ScreencastFrame,
    SourceLocation, StackFrame, Trace, Viewport,
};

/// Ingest every event log in the archive and build the trace model.
///
/// Fatal only when the archive carries no event logs at all; everything else
/// is best-effort.
pub fn ingest_archive(archive: &mut TraceArchive) -> Result<Trace> {
    let mut log_entries: Vec<String> = archive
        .entry_names()
        .iter()
        .filter(|name| name.ends_with(".trace") || name.ends_with(".network"))
        .cloned()
        .collect();
    if log_entries.is_empty() {
        bail!("archive contains no .trace or .network event logs");
    }
    // Archive order is not guaranteed stable across writers; sort so that
    // ingestion order (and with it snapshot addressing) is deterministic.
    log_entries.sort();

    let mut builder = TraceBuilder::default();
    for name in &log_entries {
        let Ok(bytes) = archive.read_entry(name) else {
            continue;
        };
        let text = String::from_utf8_lossy(&bytes);
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Ok(event) = serde_json::from_str::<TraceEvent>(line) else {
                continue;
            };
            builder.dispatch(event);
        }
    }
    Ok(builder.finish())
}

// --- Wire format ---

#[derive(Deserialize)]
#[serde(tag = "type")]
enum TraceEvent {
    #[serde(rename = "context-options")]
    ContextOptions(Box<ContextOptionsEvent>),
    #[serde(rename = "before")]
    Before(Box<BeforeEvent>),
    #[serde(rename = "after")]
    After(Box<AfterEvent>),
    #[serde(rename = "log")]
    Log(LogEvent),
    #[serde(rename = "console")]
    Console(ConsoleMessageEvent),
    #[serde(rename = "error")]
    Error(ErrorEvent),
    #[serde(rename = "resource-snapshot")]
    Resource(Box<ResourceSnapshotEvent>),
    #[serde(rename = "screencast-frame")]
    ScreencastFrame(ScreencastFrameEvent),
    #[serde(rename = "frame-snapshot")]
    FrameSnapshot(Box<FrameSnapshotEvent>),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContextOptionsEvent {
    #[serde(default)]
    browser_name: String,
    channel: Option<String>,
    platform: Option<String>,
    sdk_language: Option<String>,
    version: Option<Value>,
    title: Option<String>,
    wall_time: Option<f64>,
    monotonic_time: Option<f64>,
    #[serde(default)]
    options: ContextOptions,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BeforeEvent {
    call_id: String,
    #[serde(default)]
    start_time: f64,
    class: Option<String>,
    method: Option<String>,
    #[serde(default)]
    params: Value,
    step_id: Option<String>,
    before_snapshot: Option<String>,
    #[serde(default)]
    stack: Vec<StackFrame>,
    page_id: Option<String>,
    parent_id: Option<String>,
    title: Option<String>,
    group: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AfterEvent {
    call_id: String,
    end_time: Option<f64>,
    error: Option<ActionError>,
    result: Option<Value>,
    after_snapshot: Option<String>,
    #[serde(default)]
    attachments: Vec<Attachment>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogEvent {
    call_id: String,
    #[serde(default)]
    time: f64,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConsoleMessageEvent {
    message_type: Option<String>,
    #[serde(default)]
    time: f64,
    #[serde(default)]
    text: String,
    location: Option<SourceLocation>,
}

#[derive(Deserialize)]
struct ErrorEvent {
    #[serde(default)]
    message: String,
    #[serde(default)]
    stack: Vec<StackFrame>,
}

#[derive(Deserialize)]
struct ResourceSnapshotEvent {
    snapshot: RawResource,
}

#[derive(Deserialize, Default)]
struct RawResource {
    #[serde(default)]
    request: RawRequest,
    #[serde(default)]
    response: RawResponse,
}

#[derive(Deserialize, Default)]
struct RawRequest {
    #[serde(default)]
    method: String,
    #[serde(default)]
    url: String,
}

#[derive(Deserialize, Default)]
struct RawResponse {
    #[serde(default)]
    status: i64,
    content: Option<RawContent>,
    #[serde(rename = "_failureText")]
    failure_text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContent {
    size: Option<i64>,
    text: Option<String>,
    mime_type: Option<String>,
    #[serde(rename = "_sha1")]
    sha1: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScreencastFrameEvent {
    #[serde(default)]
    page_id: String,
    #[serde(default)]
    sha1: String,
    #[serde(default)]
    timestamp: f64,
}

#[derive(Deserialize)]
struct FrameSnapshotEvent {
    snapshot: RawFrameSnapshot,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFrameSnapshot {
    call_id: Option<String>,
    snapshot_name: Option<String>,
    page_id: Option<String>,
    #[serde(default)]
    frame_id: String,
    #[serde(default)]
    frame_url: String,
    #[serde(default)]
    timestamp: f64,
    doctype: Option<String>,
    viewport: Option<Viewport>,
    html: Value,
    #[serde(default)]
    resource_overrides: Vec<ResourceOverride>,
}

// --- Model building ---

#[derive(Default)]
struct TraceBuilder {
    trace: Trace,
    /// Actions in arrival order plus a callId index; duplicates overwrite in place.
    actions: Vec<Action>,
    by_call_id: HashMap<String, usize>,
    page_index: HashMap<String, usize>,
}

impl TraceBuilder {
    fn dispatch(&mut self, event: TraceEvent) {
        match event {
            TraceEvent::ContextOptions(e) => self.on_context_options(*e),
            TraceEvent::Before(e) => self.on_before(*e),
            TraceEvent::After(e) => self.on_after(*e),
            TraceEvent::Log(e) => self.on_log(e),
            TraceEvent::Console(e) => self.trace.console.push(ConsoleEvent {
                message_type: e.message_type.unwrap_or_else(|| "log".into()),
                time: e.time,
                text: e.text,
                location: e.location,
            }),
            TraceEvent::Error(e) => self.trace.errors.push(GlobalError {
                message: e.message,
                stack: e.stack,
            }),
            TraceEvent::Resource(e) => self.on_resource(*e),
            TraceEvent::ScreencastFrame(e) => self.on_screencast_frame(e),
            TraceEvent::FrameSnapshot(e) => self.on_frame_snapshot(*e),
        }
    }

    fn on_context_options(&mut self, e: ContextOptionsEvent) {
        let trace = &mut self.trace;
        trace.browser_name = e.browser_name;
        trace.channel = e.channel;
        trace.platform = e.platform;
        trace.sdk_language = e.sdk_language;
        trace.version = e.version.map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        });
        trace.title = e.title;
        trace.wall_time = e.wall_time;
        trace.start_time = e.monotonic_time.unwrap_or_default();
        trace.options = e.options;
    }

    fn on_before(&mut self, e: BeforeEvent) {
        let action = Action {
            call_id: e.call_id.clone(),
            class: e.class.unwrap_or_default(),
            method: e.method.unwrap_or_default(),
            params: e.params,
            start_time: e.start_time,
            end_time: e.start_time,
            log: Vec::new(),
            error: None,
            result: None,
            stack: e.stack,
            page_id: e.page_id,
            parent_id: e.parent_id,
            title: e.title,
            group: e.group,
            step_id: e.step_id,
            before_snapshot: e.before_snapshot,
            after_snapshot: None,
            attachments: Vec::new(),
        };
        match self.by_call_id.get(&e.call_id) {
            // A duplicate callId replaces the earlier action in place.
            Some(&index) => self.actions[index] = action,
            None => {
                self.by_call_id.insert(e.call_id, self.actions.len());
                self.actions.push(action);
            }
        }
    }

    fn on_after(&mut self, e: AfterEvent) {
        // An `after` for an unknown callId is dropped.
        let Some(&index) = self.by_call_id.get(&e.call_id) else {
            return;
        };
        let action = &mut self.actions[index];
        if let Some(end_time) = e.end_time {
            action.end_time = end_time;
        }
        action.error = e.error;
        action.result = e.result;
        action.after_snapshot = e.after_snapshot;
        action.attachments = e.attachments;
    }

    fn on_log(&mut self, e: LogEvent) {
        if let Some(&index) = self.by_call_id.get(&e.call_id) {
            self.actions[index].log.push(LogEntry {
                time: e.time,
                message: e.message,
            });
        }
    }

    fn on_resource(&mut self, e: ResourceSnapshotEvent) {
        let RawResource { request, response } = e.snapshot;
        let content = response.content;
        let resource = NetworkResource {
            method: request.method,
            url: request.url,
            status: response.status,
            content_type: content.as_ref().and_then(|c| c.mime_type.clone()),
            size: content.as_ref().and_then(|c| c.size),
            text: content.as_ref().and_then(|c| c.text.clone()),
            sha1: content.and_then(|c| c.sha1),
            failure: response.failure_text,
        };
        if let Some(sha1) = &resource.sha1 {
            if !resource.url.is_empty() {
                self.trace
                    .network_map
                    .insert(resource.url.clone(), sha1.clone());
            }
        }
        self.trace.resources.push(resource);
    }

    fn on_screencast_frame(&mut self, e: ScreencastFrameEvent) {
        let index = match self.page_index.get(&e.page_id) {
            Some(&index) => index,
            None => {
                self.page_index.insert(e.page_id.clone(), self.trace.pages.len());
                self.trace.pages.push(Page {
                    page_id: e.page_id,
                    frames: Vec::new(),
                });
                self.trace.pages.len() - 1
            }
        };
        self.trace.pages[index].frames.push(ScreencastFrame {
            sha1: e.sha1,
            timestamp: e.timestamp,
        });
    }

    fn on_frame_snapshot(&mut self, e: FrameSnapshotEvent) {
        let raw = e.snapshot;
        let Some(html) = DomNode::from_value(&raw.html) else {
            return;
        };
        let snapshot = FrameSnapshot {
            call_id: raw.call_id,
            snapshot_name: raw.snapshot_name,
            page_id: raw.page_id,
            frame_id: raw.frame_id,
            frame_url: raw.frame_url,
            timestamp: raw.timestamp,
            doctype: raw.doctype,
            viewport: raw.viewport,
            html,
            resource_overrides: raw.resource_overrides,
        };
        let trace = &mut self.trace;
        if !trace.frames.contains_key(&snapshot.frame_id) {
            trace.frame_order.push(snapshot.frame_id.clone());
        }
        trace
            .frames
            .entry(snapshot.frame_id.clone())
            .or_default()
            .push(snapshot);
    }

    fn finish(mut self) -> Trace {
        self.actions
            .sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        let max_end = self
            .actions
            .iter()
            .map(|a| a.end_time)
            .fold(f64::NEG_INFINITY, f64::max);
        self.trace.end_time = if max_end.is_finite() {
            max_end.max(self.trace.start_time)
        } else {
            self.trace.start_time
        };
        self.trace.actions = self.actions;
        self.trace
    }
}
