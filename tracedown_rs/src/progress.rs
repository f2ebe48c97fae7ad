//! Console feedback for an export run.
//!
//! A quiet export prints nothing but fatal errors. Otherwise one spinner
//! follows the phases of the pipeline and a recap line reports what landed
//! in the output directory.

use std::path::Path;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::export::ExportSummary;

/// Export phases, in run order; the spinner message tracks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Reading and dispatching the NDJSON event logs.
    Ingest,
    /// Extracting content-hash blobs into `assets/`.
    Assets,
    /// Rendering DOM snapshots to HTML.
    Snapshots,
    /// Writing the Markdown reports.
    Reports,
}

impl Phase {
    fn message(self) -> &'static str {
        match self {
            Phase::Ingest => "reading event logs",
            Phase::Assets => "extracting resources",
            Phase::Snapshots => "rendering DOM snapshots",
            Phase::Reports => "writing Markdown reports",
        }
    }
}

/// Spinner that follows the export phases.
///
/// Every method is a no-op in quiet mode, so the exporter never has to
/// branch on verbosity.
pub struct ExportProgress {
    bar: Option<ProgressBar>,
}

impl ExportProgress {
    pub fn new(quiet: bool) -> Self {
        if quiet {
            return Self { bar: None };
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} tracedown: {msg}")
                .expect("valid template"),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar: Some(bar) }
    }

    pub fn phase(&self, phase: Phase) {
        if let Some(bar) = &self.bar {
            bar.set_message(phase.message());
        }
    }

    /// Surface a non-fatal problem (a skipped blob, an unwritable snapshot)
    /// above the spinner line.
    pub fn note(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.println(format!("{} {message}", style("note:").yellow().bold()));
        }
    }

    pub fn finish(self) {
        if let Some(bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

/// Post-export recap: inventory of the export plus a pointer at errors.md
/// when the trace itself recorded failures.
pub fn recap(summary: &ExportSummary, output_dir: &Path) {
    println!(
        "{} {} -> {}",
        style("exported").green().bold(),
        summary.describe(),
        output_dir.display(),
    );
    if summary.errors > 0 {
        println!(
            "{} trace recorded {} error(s); see errors.md",
            style("failed trace:").red().bold(),
            summary.errors,
        );
    }
}

/// Fatal errors print to stderr even in quiet mode.
pub fn fail(message: &str) {
    eprintln!("{} {message}", style("error:").red().bold());
}
