use std::panic;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracedown::args::{USAGE, parse_args};
use tracedown::export::{ExportOptions, export_trace};
use tracedown::progress;

/// Exit quietly when the reader of our stdout goes away, e.g. when the recap
/// or a report dump is piped to `head`.
fn install_broken_pipe_handler() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let payload = info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned());
        if message.is_some_and(|m| m.contains("Broken pipe")) {
            std::process::exit(0);
        }
        default_hook(info);
    }));
}

fn main() -> ExitCode {
    install_broken_pipe_handler();

    let raw_args: Vec<String> = std::env::args().skip(1).collect();
    let parsed = match parse_args(&raw_args) {
        Ok(parsed) => parsed,
        Err(message) => {
            progress::fail(&message);
            eprintln!("\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    if parsed.show_help {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }
    if parsed.show_version {
        println!("tracedown {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }
    if parsed.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let Some(archive) = parsed.archive else {
        progress::fail("missing trace archive argument");
        eprintln!("\n{USAGE}");
        return ExitCode::from(2);
    };
    let output_dir = parsed.output.unwrap_or_else(|| default_output_dir(&archive));

    let options = ExportOptions {
        output_dir: output_dir.clone(),
        quiet: parsed.quiet,
    };
    match export_trace(&archive, &options) {
        Ok(summary) => {
            if !parsed.quiet {
                progress::recap(&summary, &output_dir);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            progress::fail(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

/// `trace.zip` -> `trace-export`, next to the archive.
fn default_output_dir(archive: &Path) -> PathBuf {
    let stem = archive
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trace".to_string());
    archive
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_default()
        .join(format!("{stem}-export"))
}
