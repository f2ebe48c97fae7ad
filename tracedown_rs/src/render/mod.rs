//! DOM snapshot rendering.
//!
//! Turns one [`FrameSnapshot`] into a complete HTML document: subtree
//! references are resolved against earlier snapshots of the same frame,
//! every URL-bearing attribute is rewritten to point at extracted blobs, and
//! a fixed restoration script re-applies runtime-only state (form values,
//! scroll positions, shadow roots, adopted stylesheets) in the browser.

use std::collections::{HashMap, HashSet};

use url::Url;

use crate::types::{DomNode, FrameSnapshot};

mod css;

/// Client-side restoration script, appended verbatim to every snapshot.
/// Kept as a fixed asset so rendered documents are byte-stable.
pub const RESTORE_SCRIPT: &str = include_str!("assets/restore.js");

/// Attribute namespace the recording engine uses for its markers.
const ENGINE_ATTRIBUTE_PREFIX: &str = "__playwright_";

/// Original frame src, stashed by the recorder so the live iframe does not
/// navigate while being captured. Re-emitted as a rewritten `src`.
const FRAME_SRC_ATTRIBUTE: &str = "__playwright_src__";

/// Engine markers that survive serialization; the restoration script consumes
/// and removes them. Every other attribute in the namespace is dropped.
const PRESERVED_ATTRIBUTES: [&str; 10] = [
    "__playwright_scroll_top_",
    "__playwright_scroll_left_",
    "__playwright_value_",
    "__playwright_checked_",
    "__playwright_selected_",
    "__playwright_popover_open_",
    "__playwright_dialog_open_",
    "__playwright_shadow_root_",
    "__playwright_custom_elements__",
    "__playwright_style_sheet_",
];

const VOID_ELEMENTS: [&str; 17] = [
    "AREA", "BASE", "BR", "COL", "COMMAND", "EMBED", "HR", "IMG", "INPUT", "KEYGEN", "LINK",
    "MENUITEM", "META", "PARAM", "SOURCE", "TRACK", "WBR",
];

/// Result of rendering one snapshot. `used_sha1s` lets the asset extractor
/// fetch blobs that were only discovered during serialization (e.g. through
/// CSS `url(...)` scanning).
pub struct RenderedSnapshot {
    pub html: String,
    pub used_sha1s: HashSet<String>,
}

/// Render the snapshot at `index` within its frame's snapshot list.
///
/// `snapshots` must be every snapshot of one frame in ingestion order; that
/// order defines the `snapshotsAgo` addressing of subtree references and the
/// `ref` chains of resource overrides.
pub fn render_snapshot(
    snapshots: &[FrameSnapshot],
    index: usize,
    network_map: &HashMap<String, String>,
) -> RenderedSnapshot {
    let snapshot = &snapshots[index];
    let mut renderer = Renderer {
        snapshots,
        network_map,
        override_map: build_override_map(snapshots, index),
        base_url: Url::parse(&snapshot.frame_url).ok(),
        node_lists: HashMap::new(),
        resolving: Vec::new(),
        used_sha1s: HashSet::new(),
        out: String::new(),
    };

    renderer.out.push_str("<!DOCTYPE ");
    renderer
        .out
        .push_str(snapshot.doctype.as_deref().unwrap_or("html"));
    renderer.out.push_str(">\n");

    let mut meta = format!(
        "snapshot: {} | frame: {} | timestamp: {}",
        snapshot.snapshot_name.as_deref().unwrap_or("(unnamed)"),
        snapshot.frame_url,
        snapshot.timestamp,
    );
    if let Some(viewport) = snapshot.viewport {
        meta.push_str(&format!(" | viewport: {}x{}", viewport.width, viewport.height));
    }
    renderer.out.push_str("<!-- ");
    renderer.out.push_str(&meta.replace("--", "- -"));
    renderer.out.push_str(" -->\n");

    renderer.visit(&snapshot.html, index, None);

    renderer.out.push_str("<script>");
    renderer.out.push_str(RESTORE_SCRIPT);
    renderer.out.push_str("</script>");

    RenderedSnapshot {
        html: renderer.out,
        used_sha1s: renderer.used_sha1s,
    }
}

/// URL -> content hash map for the snapshot at `index` (§override semantics:
/// a `ref` consults the override matching the same URL in the snapshot that
/// many positions earlier).
fn build_override_map(snapshots: &[FrameSnapshot], index: usize) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for o in &snapshots[index].resource_overrides {
        if let Some(sha1) = &o.sha1 {
            map.insert(o.url.clone(), sha1.clone());
        } else if let Some(back) = o.ref_ {
            if back <= index {
                let earlier = &snapshots[index - back];
                if let Some(prev) = earlier
                    .resource_overrides
                    .iter()
                    .find(|p| p.url == o.url)
                {
                    if let Some(sha1) = &prev.sha1 {
                        map.insert(o.url.clone(), sha1.clone());
                    }
                }
            }
        }
    }
    map
}

struct Renderer<'a> {
    snapshots: &'a [FrameSnapshot],
    network_map: &'a HashMap<String, String>,
    override_map: HashMap<String, String>,
    base_url: Option<Url>,
    /// Post-order node lists of referenced snapshots, built lazily and
    /// memoized for the duration of this render.
    node_lists: HashMap<usize, Vec<&'a DomNode>>,
    /// Subtree references currently being resolved; repeats are refused so a
    /// malformed self-referential snapshot cannot recurse forever.
    resolving: Vec<(usize, usize)>,
    used_sha1s: HashSet<String>,
    out: String,
}

impl<'a> Renderer<'a> {
    fn visit(&mut self, node: &'a DomNode, snapshot_index: usize, parent: Option<&str>) {
        match node {
            DomNode::Text(text) => {
                if parent.is_some_and(|p| p.eq_ignore_ascii_case("STYLE")) {
                    let rewritten = self.rewrite_css(text);
                    self.out.push_str(&escape_text(&rewritten));
                } else {
                    self.out.push_str(&escape_text(text));
                }
            }
            DomNode::Ref {
                snapshots_ago,
                node_index,
            } => {
                // References only ever point backward; anything else renders
                // nothing.
                if *snapshots_ago > snapshot_index {
                    return;
                }
                let target = snapshot_index - snapshots_ago;
                if self.resolving.contains(&(target, *node_index)) {
                    return;
                }
                if let Some(resolved) = self.node_at(target, *node_index) {
                    self.resolving.push((target, *node_index));
                    // Nested references inside the borrowed subtree resolve
                    // relative to the snapshot it came from.
                    self.visit(resolved, target, parent);
                    self.resolving.pop();
                }
            }
            DomNode::Element {
                name,
                attrs,
                children,
            } => {
                if name.eq_ignore_ascii_case("BASE") {
                    // A live <base> would poison relative-URL resolution when
                    // the export is viewed.
                    return;
                }
                let tag = if name.eq_ignore_ascii_case("NOSCRIPT") {
                    "X-NOSCRIPT"
                } else {
                    name.as_str()
                };
                self.out.push('<');
                self.out.push_str(tag);
                for (attr_name, attr_value) in attrs {
                    if let Some((emit_name, emit_value)) =
                        self.process_attr(name, attr_name, attr_value)
                    {
                        self.out.push(' ');
                        self.out.push_str(&emit_name);
                        self.out.push_str("=\"");
                        self.out.push_str(&escape_attr(&emit_value));
                        self.out.push('"');
                    }
                }
                self.out.push('>');
                if VOID_ELEMENTS.iter().any(|v| name.eq_ignore_ascii_case(v)) {
                    return;
                }
                for child in children {
                    self.visit(child, snapshot_index, Some(name.as_str()));
                }
                self.out.push_str("</");
                self.out.push_str(tag);
                self.out.push('>');
            }
        }
    }

    /// Node at `node_index` of the post-order list of snapshot `snapshot_index`.
    fn node_at(&mut self, snapshot_index: usize, node_index: usize) -> Option<&'a DomNode> {
        if !self.node_lists.contains_key(&snapshot_index) {
            let mut list = Vec::new();
            collect_post_order(&self.snapshots[snapshot_index].html, &mut list);
            self.node_lists.insert(snapshot_index, list);
        }
        self.node_lists[&snapshot_index].get(node_index).copied()
    }

    fn process_attr(&mut self, tag: &str, name: &str, value: &str) -> Option<(String, String)> {
        if name.starts_with(ENGINE_ATTRIBUTE_PREFIX) {
            if name == FRAME_SRC_ATTRIBUTE
                && (tag.eq_ignore_ascii_case("IFRAME") || tag.eq_ignore_ascii_case("FRAME"))
            {
                return Some(("src".to_string(), self.rewrite_url(value)));
            }
            if PRESERVED_ATTRIBUTES.contains(&name) {
                return Some((name.to_string(), value.to_string()));
            }
            return None;
        }

        let tag_is = |t: &str| tag.eq_ignore_ascii_case(t);
        let value = if name.eq_ignore_ascii_case("href") && tag_is("LINK") {
            self.rewrite_url(value)
        } else if name.eq_ignore_ascii_case("src") && (tag_is("SCRIPT") || tag_is("IMG")) {
            self.rewrite_url(value)
        } else if name == "src" && !tag_is("A") && !tag_is("LINK") {
            self.rewrite_url(value)
        } else if name == "srcset" {
            self.rewrite_srcset(value)
        } else if name == "style" {
            self.rewrite_css(value)
        } else {
            value.to_string()
        };
        Some((name.to_string(), value))
    }

    /// Map one URL to its extracted blob, or pass it through unchanged.
    ///
    /// Lookup order: override map by raw URL, override map by frame-resolved
    /// URL, network map by raw, network map by resolved.
    fn rewrite_url(&mut self, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }
        let lower = raw.trim_start().to_ascii_lowercase();
        if lower.starts_with("data:")
            || lower.starts_with("blob:")
            || lower.starts_with("javascript:")
        {
            return raw.to_string();
        }
        let resolved = self
            .base_url
            .as_ref()
            .and_then(|base| base.join(raw).ok())
            .map(String::from);
        let hit = self
            .override_map
            .get(raw)
            .or_else(|| resolved.as_deref().and_then(|r| self.override_map.get(r)))
            .or_else(|| self.network_map.get(raw))
            .or_else(|| resolved.as_deref().and_then(|r| self.network_map.get(r)))
            .cloned();
        match hit {
            Some(sha1) => {
                let path = format!("../resources/{sha1}");
                self.used_sha1s.insert(sha1);
                path
            }
            None => raw.to_string(),
        }
    }

    /// Rewrite each `srcset` entry's URL, preserving its descriptor.
    fn rewrite_srcset(&mut self, value: &str) -> String {
        let entries: Vec<String> = value
            .split(',')
            .filter_map(|entry| {
                let entry = entry.trim();
                if entry.is_empty() {
                    return None;
                }
                let mut parts = entry.splitn(2, char::is_whitespace);
                let url = parts.next().unwrap_or("");
                let descriptor = parts.next().map(str::trim).unwrap_or("");
                let rewritten = self.rewrite_url(url);
                Some(if descriptor.is_empty() {
                    rewritten
                } else {
                    format!("{rewritten} {descriptor}")
                })
            })
            .collect();
        entries.join(", ")
    }

    fn rewrite_css(&mut self, text: &str) -> String {
        let mut rewrite = |url: &str| self.rewrite_url(url);
        css::rewrite_css_urls(text, &mut rewrite)
    }
}

/// Depth-first, children-before-self node list; the addressing scheme for
/// subtree references. Reference nodes themselves are not listed.
fn collect_post_order<'a>(node: &'a DomNode, out: &mut Vec<&'a DomNode>) {
    match node {
        DomNode::Text(_) => out.push(node),
        DomNode::Ref { .. } => {}
        DomNode::Element { children, .. } => {
            for child in children {
                collect_post_order(child, out);
            }
            out.push(node);
        }
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            other => out.push(other),
        }
    }
    out
}

fn escape_attr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
