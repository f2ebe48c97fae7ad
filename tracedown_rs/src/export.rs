//! Export orchestration: archive -> model -> assets + snapshots + Markdown.
//!
//! One-shot, single-threaded and deterministic. Ingestion completes before
//! anything renders; everything after reads the immutable model. Per-item
//! failures (a missing blob, an unwritable snapshot) skip that item; failing
//! to write a Markdown file propagates.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::archive::TraceArchive;
use crate::assets::{AssetExtractor, SNAPSHOTS_DIR, sanitize_snapshot_name};
use crate::ingest::ingest_archive;
use crate::progress::{ExportProgress, Phase};
use crate::render::render_snapshot;
use crate::report::{self, ReportContext};
use crate::tree::{ActionTree, step_snapshot_map};
use crate::types::Trace;

pub struct ExportOptions {
    pub output_dir: PathBuf,
    pub quiet: bool,
}

/// What the export produced, for the CLI recap.
pub struct ExportSummary {
    pub actions: usize,
    pub errors: usize,
    pub snapshots_written: usize,
    pub resources_extracted: usize,
    pub resources_skipped: usize,
}

impl ExportSummary {
    /// One-line inventory for the CLI recap.
    pub fn describe(&self) -> String {
        format!(
            "{} action(s), {} snapshot(s), {} resource(s)",
            self.actions, self.snapshots_written, self.resources_extracted
        )
    }
}

/// Convert one trace archive into a self-contained export directory.
pub fn export_trace(archive_path: &Path, options: &ExportOptions) -> Result<ExportSummary> {
    let progress = ExportProgress::new(options.quiet);

    progress.phase(Phase::Ingest);
    let mut archive = TraceArchive::open(archive_path)?;
    let trace = ingest_archive(&mut archive)?;
    let tree = ActionTree::build(&trace.actions);
    let step_snapshots = step_snapshot_map(&trace);

    let out_dir = &options.output_dir;
    fs::create_dir_all(out_dir.join(SNAPSHOTS_DIR))
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    progress.phase(Phase::Assets);
    let mut extractor = AssetExtractor::new(&mut archive, out_dir)
        .with_context(|| format!("failed to prepare {}", out_dir.display()))?;
    extractor.extract_trace_assets(&trace);

    progress.phase(Phase::Snapshots);
    let (snapshot_pages, used_sha1s, snapshots_written) = write_snapshots(&trace, out_dir);
    extractor.extract_used(&used_sha1s);

    let resources_skipped = extractor.skipped;
    let assets = extractor.finish();
    if resources_skipped > 0 {
        progress.note(&format!(
            "{resources_skipped} resource(s) missing from the archive; links may 404"
        ));
    }

    progress.phase(Phase::Reports);
    let archive_name = archive_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trace".to_string());
    let ctx = ReportContext {
        trace: &trace,
        tree: &tree,
        assets: &assets,
        step_snapshots: &step_snapshots,
        snapshot_pages: &snapshot_pages,
        archive_name,
    };
    let files: [(&str, String); 9] = [
        ("README.md", report::render_readme(&ctx)),
        ("index.md", report::render_index(&ctx)),
        ("metadata.md", report::render_metadata(&ctx)),
        ("timeline.md", report::render_timeline(&ctx)),
        ("errors.md", report::render_errors(&ctx)),
        ("console.md", report::render_console(&ctx)),
        ("network.md", report::render_network(&ctx)),
        ("filmstrip.md", report::render_filmstrip(&ctx)),
        ("attachments.md", report::render_attachments(&ctx)),
    ];
    for (name, contents) in &files {
        write_atomic(&out_dir.join(*name), contents.as_bytes())
            .with_context(|| format!("failed to write {name}"))?;
    }
    progress.finish();

    Ok(ExportSummary {
        actions: trace.actions.len(),
        errors: report::collect_errors(&trace).len(),
        snapshots_written,
        resources_extracted: assets.len(),
        resources_skipped,
    })
}

/// Render every named frame snapshot to `assets/snapshots/`.
///
/// The first snapshot ingested under a name owns `<name>.html`; later
/// snapshots with the same name (subframes share their page snapshot's name)
/// get `<name>@<frameId>.html`. Timeline links always target the owner.
fn write_snapshots(
    trace: &Trace,
    out_dir: &Path,
) -> (HashMap<String, String>, HashSet<String>, usize) {
    let mut pages = HashMap::new();
    let mut owners: HashMap<&str, &str> = HashMap::new();
    let mut used_sha1s = HashSet::new();
    let mut written = 0usize;

    for (frame_id, snapshots) in trace.frames_in_order() {
        for (index, snapshot) in snapshots.iter().enumerate() {
            let Some(name) = snapshot.snapshot_name.as_deref() else {
                continue;
            };
            let rendered = render_snapshot(snapshots, index, &trace.network_map);
            used_sha1s.extend(rendered.used_sha1s);

            let owner = *owners.entry(name).or_insert(frame_id);
            let file_name = if owner == frame_id {
                format!("{}.html", sanitize_snapshot_name(name))
            } else {
                format!("{}.html", sanitize_snapshot_name(&format!("{name}@{frame_id}")))
            };
            let relative = format!("{SNAPSHOTS_DIR}/{file_name}");
            // A snapshot that fails to write just loses its link.
            if fs::write(out_dir.join(&relative), rendered.html).is_ok() {
                written += 1;
                if owner == frame_id {
                    pages.insert(name.to_string(), relative);
                }
            }
        }
    }
    (pages, used_sha1s, written)
}

/// Write through a temp file in the destination directory so a crash never
/// leaves a half-written report behind.
fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::other("path has no parent for atomic write"))?;
    let mut tmp = tempfile::Builder::new()
        .prefix("tracedown_tmp")
        .tempfile_in(dir)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use zip::write::SimpleFileOptions;

    fn build_archive(path: &Path, trace_lines: &[&str], resources: &[(&str, &[u8])]) {
        let file = fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        zip.start_file("trace.trace", options).unwrap();
        for line in trace_lines {
            writeln!(zip, "{line}").unwrap();
        }
        for (sha1, bytes) in resources {
            zip.start_file(format!("resources/{sha1}"), options).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn exports_reports_snapshots_and_assets() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("demo.zip");
        build_archive(
            &archive_path,
            &[
                r#"{"type":"context-options","browserName":"chromium","monotonicTime":1000.0,"options":{"viewport":{"width":1280,"height":720}}}"#,
                r#"{"type":"before","callId":"call@1","startTime":1000.0,"class":"Test","method":"step","title":"Open page"}"#,
                r#"{"type":"after","callId":"call@1","endTime":1200.0}"#,
                r#"{"type":"frame-snapshot","snapshot":{"snapshotName":"after@call@1","frameId":"f1","frameUrl":"https://a/","timestamp":1100.0,"html":["HTML",["BODY",["IMG",{"src":"https://a/logo.png"}]]]}}"#,
                r#"{"type":"resource-snapshot","snapshot":{"request":{"method":"GET","url":"https://a/logo.png"},"response":{"status":200,"content":{"size":4,"_sha1":"logohash"}}}}"#,
            ],
            &[("logohash", b"png!")],
        );

        let out = dir.path().join("out");
        let summary = export_trace(
            &archive_path,
            &ExportOptions {
                output_dir: out.clone(),
                quiet: true,
            },
        )
        .unwrap();

        assert_eq!(summary.actions, 1);
        assert_eq!(summary.errors, 0);
        assert_eq!(summary.snapshots_written, 1);
        assert_eq!(summary.describe(), "1 action(s), 1 snapshot(s), 1 resource(s)");
        assert!(out.join("index.md").exists());
        assert!(out.join("timeline.md").exists());
        let snapshot =
            fs::read_to_string(out.join("assets/snapshots/after@call@1.html")).unwrap();
        assert!(snapshot.contains("../resources/logohash"));
        assert_eq!(fs::read(out.join("assets/resources/logohash")).unwrap(), b"png!");
    }

    #[test]
    fn same_snapshot_name_across_frames_disambiguates() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("demo.zip");
        build_archive(
            &archive_path,
            &[
                r#"{"type":"before","callId":"call@1","startTime":1.0,"class":"Test","method":"step"}"#,
                r#"{"type":"frame-snapshot","snapshot":{"snapshotName":"before@call@1","frameId":"main","frameUrl":"https://a/","timestamp":1.0,"html":["HTML",["BODY","outer"]]}}"#,
                r#"{"type":"frame-snapshot","snapshot":{"snapshotName":"before@call@1","frameId":"child","frameUrl":"https://a/inner","timestamp":1.0,"html":["HTML",["BODY","inner"]]}}"#,
            ],
            &[],
        );

        let out = dir.path().join("out");
        export_trace(
            &archive_path,
            &ExportOptions {
                output_dir: out.clone(),
                quiet: true,
            },
        )
        .unwrap();

        assert!(out.join("assets/snapshots/before@call@1.html").exists());
        assert!(out.join("assets/snapshots/before@call@1@child.html").exists());
    }

    #[test]
    fn missing_resources_are_nonfatal() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("demo.zip");
        build_archive(
            &archive_path,
            &[
                r#"{"type":"screencast-frame","pageId":"p1","sha1":"gone","timestamp":1.0}"#,
            ],
            &[],
        );

        let out = dir.path().join("out");
        let summary = export_trace(
            &archive_path,
            &ExportOptions {
                output_dir: out,
                quiet: true,
            },
        )
        .unwrap();
        assert_eq!(summary.resources_skipped, 1);
        assert_eq!(summary.resources_extracted, 0);
    }

    #[test]
    fn empty_archive_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("empty.zip");
        let file = fs::File::create(&archive_path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("unrelated.txt", SimpleFileOptions::default())
            .unwrap();
        zip.finish().unwrap();

        let result = export_trace(
            &archive_path,
            &ExportOptions {
                output_dir: dir.path().join("out"),
                quiet: true,
            },
        );
        assert!(result.is_err());
    }
}
