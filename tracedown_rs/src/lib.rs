//! # tracedown
//!
//! **Trace archive exporter** - converts a recorded browser-automation trace
//! archive into a self-contained directory of human- and LLM-readable
//! Markdown files plus renderable HTML snapshots of the page DOM at each
//! action.
//!
//! The input is a ZIP containing append-only NDJSON event logs (`*.trace`,
//! `*.network`) and opaque resource blobs keyed by content hash. The output
//! directory describes what happened (timeline, errors, console, network,
//! filmstrip, attachments, metadata) and can be served by any static HTTP
//! server so the snapshot HTML reproduces the recorded page state.
//!
//! ## Library usage
//!
//! ```rust,no_run
//! use std::path::{Path, PathBuf};
//! use tracedown::export::{ExportOptions, export_trace};
//!
//! let summary = export_trace(
//!     Path::new("trace.zip"),
//!     &ExportOptions {
//!         output_dir: PathBuf::from("trace-export"),
//!         quiet: true,
//!     },
//! )?;
//! println!("{} actions, {} snapshots", summary.actions, summary.snapshots_written);
//! # anyhow::Ok(())
//! ```
//!
//! ## CLI usage
//!
//! ```bash
//! tracedown trace.zip                 # export next to the archive
//! tracedown trace.zip -o report/      # pick the output directory
//! tracedown trace.zip -q              # errors only
//! ```

/// ZIP-backed blob store for trace archives.
pub mod archive;

/// Command-line argument parsing.
///
/// Contains [`ParsedArgs`](args::ParsedArgs) and [`parse_args`](args::parse_args).
pub mod args;

/// Content-hash closure computation and blob extraction to `assets/`.
pub mod assets;

/// Export orchestration; [`export::export_trace`] is the one entry point.
pub mod export;

/// NDJSON event ingestion into the trace model.
pub mod ingest;

/// Console feedback for an export run (phase spinner, recap lines).
pub mod progress;

/// DOM snapshot rendering: subtree references, URL rewriting, restoration
/// script injection. The hard part.
pub mod render;

/// Markdown writers, one pure function per output file.
pub mod report;

/// Action tree reconstruction and step-to-snapshot mapping.
pub mod tree;

/// The immutable trace model.
pub mod types;
