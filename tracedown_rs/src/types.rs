//! Core model types for an ingested trace.
//!
//! Everything here is built once by [`crate::ingest`] and immutable afterwards:
//! - [`Trace`] - the top-level container (context, actions, events, snapshots)
//! - [`Action`] - one recorded automation call or user-level test step
//! - [`FrameSnapshot`] / [`DomNode`] - serialized DOM trees with subtree references
//! - [`NetworkResource`] - request/response records from the network log

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Action class used for user-visible test steps. Everything else is API-level.
pub const TEST_CLASS: &str = "Test";

/// Group tag for actions whose parameters are not worth surfacing.
pub const INTERNAL_GROUP: &str = "internal";

/// Top-level container for one ingested trace archive.
#[derive(Debug, Default)]
pub struct Trace {
    pub browser_name: String,
    pub channel: Option<String>,
    pub platform: Option<String>,
    pub sdk_language: Option<String>,
    /// Trace format version as reported by the recorder (number or string).
    pub version: Option<String>,
    pub title: Option<String>,
    /// Wall-clock time of the recording start, in ms since the Unix epoch.
    pub wall_time: Option<f64>,
    /// Monotonic clock at recording start (ms). All other times share this base.
    pub start_time: f64,
    /// Monotonic clock at the end of the last action (ms).
    pub end_time: f64,
    pub options: ContextOptions,
    /// Actions sorted by start time after ingestion.
    pub actions: Vec<Action>,
    pub console: Vec<ConsoleEvent>,
    pub errors: Vec<GlobalError>,
    pub resources: Vec<NetworkResource>,
    pub pages: Vec<Page>,
    /// Frame snapshots grouped by frame id, in ingestion order.
    /// That order defines the `snapshotsAgo` addressing of subtree references.
    pub frames: HashMap<String, Vec<FrameSnapshot>>,
    /// Frame ids in first-seen order, so exports stay deterministic.
    pub frame_order: Vec<String>,
    /// URL -> content hash derived from the network log. Last write wins.
    pub network_map: HashMap<String, String>,
}

impl Trace {
    /// Monotonic duration of the whole trace in ms.
    pub fn duration_ms(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }

    /// Frame snapshot lists in deterministic (first-seen) frame order.
    pub fn frames_in_order(&self) -> impl Iterator<Item = (&str, &[FrameSnapshot])> {
        self.frame_order
            .iter()
            .filter_map(|id| self.frames.get(id).map(|list| (id.as_str(), list.as_slice())))
    }
}

/// Browser-context options captured at recording time.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextOptions {
    pub viewport: Option<Viewport>,
    pub device_scale_factor: Option<f64>,
    #[serde(default)]
    pub is_mobile: bool,
    pub user_agent: Option<String>,
    #[serde(rename = "baseURL")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// One recorded browser-automation operation or user-level test step.
#[derive(Debug, Clone)]
pub struct Action {
    /// Opaque id, unique within the trace.
    pub call_id: String,
    /// `"Test"` for user-visible steps; anything else is API-level.
    pub class: String,
    pub method: String,
    pub params: Value,
    pub start_time: f64,
    pub end_time: f64,
    pub log: Vec<LogEntry>,
    pub error: Option<ActionError>,
    pub result: Option<Value>,
    pub stack: Vec<StackFrame>,
    pub page_id: Option<String>,
    /// Parent action id; unresolved parents re-root under the synthetic root.
    pub parent_id: Option<String>,
    pub title: Option<String>,
    pub group: Option<String>,
    /// Back-reference from an API action to the user-level step that caused it.
    pub step_id: Option<String>,
    pub before_snapshot: Option<String>,
    pub after_snapshot: Option<String>,
    pub attachments: Vec<Attachment>,
}

impl Action {
    pub fn is_test_step(&self) -> bool {
        self.class == TEST_CLASS
    }

    pub fn duration_ms(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }

    /// Human-readable label: explicit title, else the API method name.
    pub fn label(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => &self.method,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionError {
    #[serde(default)]
    pub message: String,
    pub stack: Option<String>,
}

/// One frame of a recorded stack trace.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    #[serde(default)]
    pub file: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub function: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    #[serde(default)]
    pub content_type: String,
    pub sha1: Option<String>,
}

/// One console message emitted by the page.
#[derive(Debug, Clone)]
pub struct ConsoleEvent {
    /// Severity tag (`log`, `warning`, `error`, ...).
    pub message_type: String,
    pub time: f64,
    pub text: String,
    pub location: Option<SourceLocation>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub line_number: u32,
    #[serde(default)]
    pub column_number: u32,
}

/// An uncaught page error reported outside any action.
#[derive(Debug, Clone)]
pub struct GlobalError {
    pub message: String,
    pub stack: Vec<StackFrame>,
}

/// One request/response pair from the network log.
#[derive(Debug, Clone)]
pub struct NetworkResource {
    pub method: String,
    pub url: String,
    pub status: i64,
    pub content_type: Option<String>,
    pub size: Option<i64>,
    pub text: Option<String>,
    /// Content hash of the response body blob, when captured.
    pub sha1: Option<String>,
    pub failure: Option<String>,
}

/// A page and its ordered screencast frames.
#[derive(Debug, Clone)]
pub struct Page {
    pub page_id: String,
    pub frames: Vec<ScreencastFrame>,
}

#[derive(Debug, Clone)]
pub struct ScreencastFrame {
    pub sha1: String,
    pub timestamp: f64,
}

/// A serialized DOM tree of one frame at one instant.
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    pub call_id: Option<String>,
    pub snapshot_name: Option<String>,
    pub page_id: Option<String>,
    pub frame_id: String,
    /// Base URL for resolving relative references inside this snapshot.
    pub frame_url: String,
    pub timestamp: f64,
    pub doctype: Option<String>,
    pub viewport: Option<Viewport>,
    pub html: DomNode,
    pub resource_overrides: Vec<ResourceOverride>,
}

/// Per-snapshot instruction to map a URL to a content hash.
///
/// Exactly one of `sha1` / `ref_` is meaningful: `ref_` means "consult the
/// snapshot that many positions earlier in the same frame for the override
/// matching this URL".
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceOverride {
    #[serde(default)]
    pub url: String,
    pub sha1: Option<String>,
    #[serde(rename = "ref")]
    pub ref_: Option<usize>,
}

/// A DOM node in the snapshot wire format.
///
/// Three JSON shapes are recognized:
/// - `"text"` - a text node
/// - `[[snapshotsAgo, nodeIndex]]` - a subtree reference borrowing a node from
///   an earlier snapshot of the same frame (post-order index)
/// - `["NAME", {attrs}?, ...children]` - an element
#[derive(Debug, Clone, PartialEq)]
pub enum DomNode {
    Text(String),
    Ref {
        snapshots_ago: usize,
        node_index: usize,
    },
    Element {
        name: String,
        attrs: Vec<(String, String)>,
        children: Vec<DomNode>,
    },
}

impl DomNode {
    /// Structural parse of the wire shape. Returns `None` for anything that is
    /// not one of the three recognized shapes; callers drop such nodes.
    pub fn from_value(value: &Value) -> Option<DomNode> {
        match value {
            Value::String(text) => Some(DomNode::Text(text.clone())),
            Value::Array(items) => match items.first() {
                // The subtree reference is the only shape whose first element
                // is itself a two-element array.
                Some(Value::Array(pair)) if pair.len() == 2 => {
                    let snapshots_ago = pair[0].as_u64()? as usize;
                    let node_index = pair[1].as_u64()? as usize;
                    Some(DomNode::Ref {
                        snapshots_ago,
                        node_index,
                    })
                }
                Some(Value::String(name)) => {
                    let mut attrs = Vec::new();
                    let mut rest = &items[1..];
                    if let Some(Value::Object(map)) = rest.first() {
                        attrs = map.iter().map(|(k, v)| (k.clone(), attr_string(v))).collect();
                        rest = &rest[1..];
                    }
                    let children = rest.iter().filter_map(DomNode::from_value).collect();
                    Some(DomNode::Element {
                        name: name.clone(),
                        attrs,
                        children,
                    })
                }
                _ => None,
            },
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for DomNode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        DomNode::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom("unrecognized DOM node shape"))
    }
}

fn attr_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
