//! Command-line argument parsing.

use std::path::PathBuf;

#[derive(Debug, Default, Clone)]
pub struct ParsedArgs {
    /// Positional: the trace archive to export.
    pub archive: Option<PathBuf>,
    /// `-o/--output`; derived from the archive name when absent.
    pub output: Option<PathBuf>,
    pub quiet: bool,
    pub no_color: bool,
    pub show_help: bool,
    pub show_version: bool,
}

pub const USAGE: &str = "tracedown - export browser-automation traces to Markdown + HTML\n\n\
Usage: tracedown <trace.zip> [options]\n\n\
Options:\n  \
  -o, --output <dir>   Output directory (default: <archive-stem>-export)\n  \
  -q, --quiet          Suppress progress output (errors still print)\n  \
      --no-color       Disable ANSI colors\n  \
  -h, --help           Show this help\n  \
  -V, --version        Show version\n\n\
The export is a one-shot batch: Markdown reports land at the output root,\n\
extracted blobs under assets/, and one renderable HTML document per DOM\n\
snapshot under assets/snapshots/.";

/// No flag affects export semantics; parsing is strict so typos fail fast.
pub fn parse_args(args: &[String]) -> Result<ParsedArgs, String> {
    let mut parsed = ParsedArgs::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => parsed.show_help = true,
            "-V" | "--version" => parsed.show_version = true,
            "-q" | "--quiet" => parsed.quiet = true,
            "--no-color" => parsed.no_color = true,
            "-o" | "--output" => {
                let value = iter
                    .next()
                    .ok_or_else(|| format!("{arg} requires a directory argument"))?;
                parsed.output = Some(PathBuf::from(value));
            }
            flag if flag.starts_with('-') && flag.len() > 1 => {
                return Err(format!("unknown option: {flag}"));
            }
            positional => {
                if parsed.archive.is_some() {
                    return Err(format!("unexpected extra argument: {positional}"));
                }
                parsed.archive = Some(PathBuf::from(positional));
            }
        }
    }
    Ok(parsed)
}
