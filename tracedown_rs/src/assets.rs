//! Asset extraction: content-hash closure -> files under `assets/`.
//!
//! Resources live in the archive as opaque blobs keyed by content hash. The
//! extractor computes every hash the export can reference (snapshot override
//! chains, screencast frames, the network map, attachments), writes the blobs
//! under stable names, and returns a hash -> relative-path map for link
//! rendering. Attachments get their declared filename (sanitized); everything
//! else is addressed by hash.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::archive::TraceArchive;
use crate::types::{FrameSnapshot, Trace};

pub const RESOURCES_DIR: &str = "assets/resources";
pub const ATTACHMENTS_DIR: &str = "assets/attachments";
pub const SNAPSHOTS_DIR: &str = "assets/snapshots";

/// Content hash -> path relative to the output root.
#[derive(Debug, Default)]
pub struct AssetMap {
    paths: HashMap<String, String>,
}

impl AssetMap {
    pub fn path_for(&self, sha1: &str) -> Option<&str> {
        self.paths.get(sha1).map(String::as_str)
    }

    /// Markdown-ready `./assets/...` link for a hash, if extracted.
    pub fn link(&self, sha1: &str) -> Option<String> {
        self.path_for(sha1).map(|path| format!("./{path}"))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn insert_for_tests(&mut self, sha1: &str, path: &str) {
        self.paths.insert(sha1.to_string(), path.to_string());
    }
}

/// Replace filesystem-hostile characters in a declared attachment name.
/// Defeats path traversal; everything else passes through.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect()
}

/// Snapshot names become file names; anything outside `[A-Za-z0-9@_-]` is
/// replaced so a static server can serve them without escaping.
pub fn sanitize_snapshot_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '@' | '_' | '-' => c,
            _ => '_',
        })
        .collect()
}

/// Extracts blobs from the archive into the output directory.
///
/// Per-blob failures (missing entry, unreadable bytes) are counted and
/// skipped; the referencing link will simply 404 when viewed.
pub struct AssetExtractor<'a> {
    archive: &'a mut TraceArchive,
    out_dir: PathBuf,
    map: AssetMap,
    attempted: HashSet<String>,
    attachment_names: HashMap<String, String>,
    pub skipped: usize,
}

impl<'a> AssetExtractor<'a> {
    pub fn new(archive: &'a mut TraceArchive, out_dir: &Path) -> std::io::Result<Self> {
        fs::create_dir_all(out_dir.join(RESOURCES_DIR))?;
        fs::create_dir_all(out_dir.join(ATTACHMENTS_DIR))?;
        Ok(Self {
            archive,
            out_dir: out_dir.to_path_buf(),
            map: AssetMap::default(),
            attempted: HashSet::new(),
            attachment_names: HashMap::new(),
            skipped: 0,
        })
    }

    /// Extract everything reachable from the ingested model: snapshot
    /// overrides (following `ref` chains), screencast frames, the network
    /// map, and attachments. Attachment paths win over resource paths.
    pub fn extract_trace_assets(&mut self, trace: &Trace) {
        for (_, snapshots) in trace.frames_in_order() {
            for (index, snapshot) in snapshots.iter().enumerate() {
                for o in &snapshot.resource_overrides {
                    if let Some(sha1) = resolve_override_chain(snapshots, index, &o.url) {
                        self.extract_resource(&sha1);
                    }
                }
            }
        }
        for page in &trace.pages {
            for frame in &page.frames {
                self.extract_resource(&frame.sha1);
            }
        }
        let mut network_sha1s: Vec<&String> = trace.network_map.values().collect();
        network_sha1s.sort();
        for sha1 in network_sha1s {
            self.extract_resource(sha1);
        }
        for action in &trace.actions {
            for attachment in &action.attachments {
                if let Some(sha1) = &attachment.sha1 {
                    self.extract_attachment(sha1, &attachment.name);
                }
            }
        }
    }

    /// Extract hashes the renderer reported as used but that the model walk
    /// did not reach (e.g. discovered through CSS `url(...)` scanning).
    pub fn extract_used(&mut self, used_sha1s: &HashSet<String>) {
        let mut ordered: Vec<&String> = used_sha1s.iter().collect();
        ordered.sort();
        for sha1 in ordered {
            self.extract_resource(sha1);
        }
    }

    pub fn finish(self) -> AssetMap {
        self.map
    }

    fn extract_resource(&mut self, sha1: &str) {
        if sha1.is_empty() || !self.attempted.insert(sha1.to_string()) {
            return;
        }
        match self.archive.read_resource(sha1) {
            Ok(bytes) => {
                let relative = format!("{RESOURCES_DIR}/{sha1}");
                if fs::write(self.out_dir.join(&relative), bytes).is_ok() {
                    // Friendly attachment paths keep priority over hash paths.
                    self.map.paths.entry(sha1.to_string()).or_insert(relative);
                } else {
                    self.skipped += 1;
                }
            }
            Err(_) => self.skipped += 1,
        }
    }

    fn extract_attachment(&mut self, sha1: &str, name: &str) {
        if sha1.is_empty() {
            return;
        }
        let mut file_name = sanitize_filename(name);
        match self.attachment_names.get(&file_name) {
            // Same name, same content: nothing more to do.
            Some(existing) if existing == sha1 => return,
            // Same name, different content: prefix with the hash.
            Some(_) => {
                let prefix: String = sha1.chars().take(8).collect();
                file_name = format!("{prefix}-{file_name}");
            }
            None => {}
        }
        match self.archive.read_resource(sha1) {
            Ok(bytes) => {
                let relative = format!("{ATTACHMENTS_DIR}/{file_name}");
                if fs::write(self.out_dir.join(&relative), bytes).is_ok() {
                    self.attachment_names
                        .insert(file_name, sha1.to_string());
                    // The friendly path wins even when the hash was already
                    // extracted as a plain resource.
                    self.map.paths.insert(sha1.to_string(), relative);
                } else {
                    self.skipped += 1;
                }
            }
            Err(_) => self.skipped += 1,
        }
    }
}

/// Walk an override `ref` chain backward until a sha1 turns up or the chain
/// ends. Chains only ever step backward, so traversal is bounded by the
/// snapshot index.
fn resolve_override_chain(
    snapshots: &[FrameSnapshot],
    start_index: usize,
    url: &str,
) -> Option<String> {
    let mut index = start_index;
    loop {
        let over = snapshots[index]
            .resource_overrides
            .iter()
            .find(|o| o.url == url)?;
        if let Some(sha1) = &over.sha1 {
            return Some(sha1.clone());
        }
        let back = over.ref_?;
        if back == 0 || back > index {
            return None;
        }
        index -= back;
    }
}
