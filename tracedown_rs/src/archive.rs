//! Trace archive access.
//!
//! A trace archive is a plain ZIP used as a keyed blob store: NDJSON event
//! logs (`*.trace`, `*.network`) plus opaque resource bodies under
//! `resources/<content-hash>`. This module only knows how to list entries and
//! return raw bytes; interpreting them is the ingestor's job.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use zip::ZipArchive;

/// An opened trace archive. Held for the lifetime of one export.
pub struct TraceArchive {
    zip: ZipArchive<File>,
    entry_names: Vec<String>,
}

impl TraceArchive {
    /// Open the archive. Missing or unreadable archives are fatal.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open trace archive {}", path.display()))?;
        let zip = ZipArchive::new(file)
            .with_context(|| format!("{} is not a readable ZIP archive", path.display()))?;
        let entry_names = zip.file_names().map(str::to_string).collect();
        Ok(Self { zip, entry_names })
    }

    /// All entry names, in archive order.
    pub fn entry_names(&self) -> &[String] {
        &self.entry_names
    }

    /// Raw bytes of one entry.
    pub fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut entry = self
            .zip
            .by_name(name)
            .with_context(|| format!("archive has no entry named {name}"))?;
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut bytes)
            .with_context(|| format!("failed to read archive entry {name}"))?;
        Ok(bytes)
    }

    /// Bytes of the resource blob for a content hash, if present.
    pub fn read_resource(&mut self, sha1: &str) -> Result<Vec<u8>> {
        self.read_entry(&format!("resources/{sha1}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_archive(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for (name, bytes) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn lists_and_reads_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.zip");
        write_archive(
            &path,
            &[
                ("trace.trace", b"{}\n".as_slice()),
                ("resources/abc123", b"body".as_slice()),
            ],
        );

        let mut archive = TraceArchive::open(&path).unwrap();
        assert_eq!(archive.entry_names().len(), 2);
        assert_eq!(archive.read_entry("trace.trace").unwrap(), b"{}\n");
        assert_eq!(archive.read_resource("abc123").unwrap(), b"body");
    }

    #[test]
    fn missing_entry_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.zip");
        write_archive(&path, &[("trace.trace", b"".as_slice())]);

        let mut archive = TraceArchive::open(&path).unwrap();
        assert!(archive.read_resource("nope").is_err());
    }

    #[test]
    fn missing_archive_is_fatal() {
        assert!(TraceArchive::open(Path::new("/definitely/not/here.zip")).is_err());
    }
}
