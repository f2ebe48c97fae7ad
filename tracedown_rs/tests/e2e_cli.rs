//! End-to-End CLI tests for tracedown
//!
//! Each test builds a synthetic trace archive, runs the binary against it and
//! asserts on the exported files.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Get a command pointing to the tracedown binary
fn tracedown() -> Command {
    cargo_bin_cmd!("tracedown")
}

/// Build a trace archive from NDJSON lines plus hash-keyed resource blobs.
fn build_archive(path: &Path, trace_lines: &[String], resources: &[(&str, &[u8])]) {
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

fn context_line() -> String {
    concat!(
        r#"{"type":"context-options","browserName":"chromium","platform":"linux","sdkLanguage":"javascript","#,
        r#""monotonicTime":1000.0,"wallTime":1700000000000.0,"#,
        r#""options":{"viewport":{"width":1280,"height":720},"isMobile":false}}"#
    )
    .to_string()
}

fn test_step(call_id: &str, title: &str, start: f64, end: f64) -> Vec<String> {
    vec![
        format!(
            r#"{{"type":"before","callId":"{call_id}","startTime":{start},"class":"Test","method":"step","title":"{title}"}}"#
        ),
        format!(r#"{{"type":"after","callId":"{call_id}","endTime":{end}}}"#),
    ]
}

struct Export {
    _dir: TempDir,
    out: PathBuf,
}

/// Run an export over the given events/resources and return the output dir.
fn export(trace_lines: &[String], resources: &[(&str, &[u8])]) -> Export {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("trace.zip");
    build_archive(&archive, trace_lines, resources);
    let out = dir.path().join("export");

    tracedown()
        .arg(&archive)
        .args(["-o"])
        .arg(&out)
        .arg("-q")
        .assert()
        .success();
    Export { _dir: dir, out }
}

fn read(export: &Export, name: &str) -> String {
    fs::read_to_string(export.out.join(name))
        .unwrap_or_else(|e| panic!("missing output file {name}: {e}"))
}

// ============================================
// Basic CLI Tests
// ============================================

mod cli_basics {
    use super::*;

    #[test]
    fn shows_help() {
        tracedown()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("tracedown"))
            .stdout(predicate::str::contains("--output"));
    }

    #[test]
    fn shows_version() {
        tracedown()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn missing_archive_argument_is_a_usage_error() {
        tracedown().assert().code(2);
    }

    #[test]
    fn unreadable_archive_is_fatal() {
        tracedown()
            .arg("/definitely/not/here.zip")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("trace archive"));
    }

    #[test]
    fn unknown_flag_is_a_usage_error() {
        tracedown().arg("--frobnicate").assert().code(2);
    }
}

// ============================================
// Passing trace
// ============================================

mod passing_trace {
    use super::*;

    fn twelve_action_export() -> Export {
        let mut lines = vec![context_line()];
        for n in 1..=12 {
            let start = 1000.0 + n as f64 * 100.0;
            lines.extend(test_step(
                &format!("call@{n}"),
                &format!("Step {n}"),
                start,
                start + 50.0,
            ));
        }
        export(&lines, &[])
    }

    #[test]
    fn index_reports_passed_with_counts() {
        let exported = twelve_action_export();
        let index = read(&exported, "index.md");
        assert!(index.contains("**Status:** PASSED"), "{index}");
        assert!(index.contains("**Viewport:** 1280x720"));
        assert!(index.contains("**Actions:** 12"));
        assert!(index.contains("**Errors:** 0"));
    }

    #[test]
    fn timeline_counts_actions_and_numbers_steps() {
        let exported = twelve_action_export();
        let timeline = read(&exported, "timeline.md");
        assert!(timeline.contains("Total actions: 12"));
        assert!(timeline.contains("## 1. Step 1"));
        assert!(timeline.contains("## 12. Step 12"));
        assert!(timeline.contains("- [1. Step 1](#1-step-1)"));
    }

    #[test]
    fn every_report_file_exists() {
        let exported = twelve_action_export();
        for name in [
            "README.md",
            "index.md",
            "metadata.md",
            "timeline.md",
            "errors.md",
            "console.md",
            "network.md",
            "filmstrip.md",
            "attachments.md",
        ] {
            assert!(exported.out.join(name).exists(), "missing {name}");
        }
    }
}

// ============================================
// Errored trace
// ============================================

mod errored_trace {
    use super::*;

    #[test]
    fn errors_md_lists_the_failure_with_ansi_stripped() {
        let lines = vec![
            context_line(),
            r#"{"type":"before","callId":"call@1","startTime":1100.0,"class":"Test","method":"goto","title":"Navigate"}"#
                .to_string(),
            concat!(
                r#"{"type":"after","callId":"call@1","endTime":1200.0,"error":{"message":"#,
                r#""\u001b[31mProtocol error (Page.navigate): Cannot navigate to invalid URL\u001b[0m"}}"#
            )
            .to_string(),
        ];
        let exported = export(&lines, &[]);

        let errors = read(&exported, "errors.md");
        assert!(errors.contains("Total errors: 1"), "{errors}");
        assert!(
            errors.contains("Protocol error (Page.navigate): Cannot navigate to invalid URL")
        );
        assert!(!errors.contains('\u{1b}'));

        let index = read(&exported, "index.md");
        assert!(index.contains("**Status:** FAILED"));
    }
}

// ============================================
// Snapshot restoration markers
// ============================================

mod snapshot_restoration {
    use super::*;

    fn snapshot_export() -> Export {
        let html = concat!(
            r#"["HTML",["BODY",{"__playwright_scroll_top_":"500"},"#,
            r#"["INPUT",{"type":"text","__playwright_value_":"Hello World"}],"#,
            r#"["INPUT",{"type":"checkbox","__playwright_checked_":"true"}]]]"#
        );
        let mut lines = vec![context_line()];
        lines.extend(test_step("call@1", "Fill form", 1100.0, 1200.0));
        lines.push(format!(
            concat!(
                r#"{{"type":"frame-snapshot","snapshot":{{"snapshotName":"after@call@1","frameId":"main","#,
                r#""frameUrl":"https://example.com/","timestamp":1150.0,"html":{html}}}}}"#
            ),
            html = html
        ));
        export(&lines, &[])
    }

    #[test]
    fn markers_survive_into_the_snapshot_html() {
        let exported = snapshot_export();
        let html = fs::read_to_string(
            exported.out.join("assets/snapshots/after@call@1.html"),
        )
        .unwrap();
        assert!(html.starts_with("<!DOCTYPE html>\n"));
        assert!(html.contains(r#"__playwright_scroll_top_="500""#));
        assert!(html.contains(r#"__playwright_value_="Hello World""#));
        assert!(html.contains(r#"__playwright_checked_="true""#));
    }

    #[test]
    fn restoration_script_is_embedded_once_at_the_end() {
        let exported = snapshot_export();
        let html = fs::read_to_string(
            exported.out.join("assets/snapshots/after@call@1.html"),
        )
        .unwrap();
        assert!(html.ends_with("</script>"));
        assert_eq!(html.matches("__playwright_scroll_top_';").count(), 1);
        // The script wires scroll restoration to the load event.
        assert!(html.contains("addEventListener('load'"));
        assert!(html.contains("element.scrollTop"));
        assert!(html.contains("element.value = element.getAttribute"));
        assert!(html.contains("element.checked = element.getAttribute"));
    }
}

// ============================================
// Shadow DOM + custom elements
// ============================================

mod shadow_dom {
    use super::*;

    #[test]
    fn shadow_templates_and_custom_element_registrations_render() {
        let html = concat!(
            r#"["HTML",["BODY",{"__playwright_custom_elements__":"my-custom-element"},"#,
            r#"["DIV",{"id":"shadowHost"},"#,
            r#"["TEMPLATE",{"__playwright_shadow_root_":"open"},["SPAN","Content inside shadow DOM"]]],"#,
            r#"["MY-CUSTOM-ELEMENT","fallback"]]]"#
        );
        let mut lines = vec![context_line()];
        lines.extend(test_step("call@1", "Open widget", 1100.0, 1200.0));
        lines.push(format!(
            concat!(
                r#"{{"type":"frame-snapshot","snapshot":{{"snapshotName":"after@call@1","frameId":"main","#,
                r#""frameUrl":"https://example.com/","timestamp":1150.0,"html":{html}}}}}"#
            ),
            html = html
        ));
        let exported = export(&lines, &[]);

        let html = fs::read_to_string(
            exported.out.join("assets/snapshots/after@call@1.html"),
        )
        .unwrap();
        assert!(html.contains(r#"<DIV id="shadowHost">"#));
        assert!(html.contains(r#"<TEMPLATE __playwright_shadow_root_="open">"#));
        assert!(html.contains("Content inside shadow DOM"));
        assert!(html.contains(r#"__playwright_custom_elements__="my-custom-element""#));
        // Restoration script attaches shadow roots and registers the elements.
        assert!(html.contains("attachShadow({ mode: 'open' })"));
        assert!(html.contains("customElements.define"));
    }
}

// ============================================
// Filmstrip
// ============================================

mod filmstrip {
    use super::*;

    #[test]
    fn five_frames_export_in_time_order_with_real_files() {
        let mut lines = vec![context_line()];
        lines.extend(test_step("call@1", "Scroll around", 1100.0, 1900.0));
        // Two pages, interleaved timestamps: emitted order must be global.
        let frames = [
            ("p1", "frame1", 1100.0),
            ("p2", "frame2", 1200.0),
            ("p1", "frame3", 1300.0),
            ("p2", "frame4", 1400.0),
            ("p1", "frame5", 1500.0),
        ];
        for (page, sha1, ts) in frames {
            lines.push(format!(
                r#"{{"type":"screencast-frame","pageId":"{page}","sha1":"{sha1}","timestamp":{ts}}}"#
            ));
        }
        let resources: Vec<(&str, &[u8])> = vec![
            ("frame1", b"jpeg1"),
            ("frame2", b"jpeg2"),
            ("frame3", b"jpeg3"),
            ("frame4", b"jpeg4"),
            ("frame5", b"jpeg5"),
        ];
        let exported = export(&lines, &resources);

        let filmstrip = read(&exported, "filmstrip.md");
        assert!(filmstrip.contains("Total screenshots: 5"), "{filmstrip}");
        let mut last = 0;
        for sha1 in ["frame1", "frame2", "frame3", "frame4", "frame5"] {
            let link = format!("[view](./assets/resources/{sha1})");
            let position = filmstrip.find(&link).unwrap_or_else(|| {
                panic!("missing link {link} in: {filmstrip}")
            });
            assert!(position > last, "frames out of order");
            last = position;

            let blob = exported.out.join("assets/resources").join(sha1);
            let metadata = fs::metadata(&blob).unwrap();
            assert!(metadata.len() > 0, "{sha1} extracted empty");
        }
    }
}

// ============================================
// Attachments
// ============================================

mod attachments {
    use super::*;

    #[test]
    fn attachments_get_friendly_files_with_exact_bytes() {
        let mut lines = vec![context_line()];
        lines.push(
            r#"{"type":"before","callId":"call@1","startTime":1100.0,"class":"Test","method":"step","title":"Capture"}"#.to_string(),
        );
        lines.push(
            concat!(
                r#"{"type":"after","callId":"call@1","endTime":1200.0,"attachments":["#,
                r#"{"name":"test-log.txt","contentType":"text/plain","sha1":"sha-log"},"#,
                r#"{"name":"test-data.json","contentType":"application/json","sha1":"sha-data"},"#,
                r#"{"name":"page-screenshot.png","contentType":"image/png","sha1":"sha-png"}]}"#
            )
            .to_string(),
        );
        let resources: Vec<(&str, &[u8])> = vec![
            ("sha-log", b"log line one\n"),
            ("sha-data", br#"{"ok":true}"#),
            ("sha-png", b"\x89PNG fake"),
        ];
        let exported = export(&lines, &resources);

        for (name, bytes) in [
            ("test-log.txt", b"log line one\n".as_slice()),
            ("test-data.json", br#"{"ok":true}"#.as_slice()),
            ("page-screenshot.png", b"\x89PNG fake".as_slice()),
        ] {
            let path = exported.out.join("assets/attachments").join(name);
            assert_eq!(fs::read(&path).unwrap(), bytes, "wrong bytes for {name}");
        }

        let attachments = read(&exported, "attachments.md");
        assert!(attachments.contains("Total attachments: 3"));
        assert!(attachments.contains("[test-log.txt](./assets/attachments/test-log.txt)"));
        assert!(attachments.contains("[test-data.json](./assets/attachments/test-data.json)"));
        assert!(
            attachments.contains("[page-screenshot.png](./assets/attachments/page-screenshot.png)")
        );

        let timeline = read(&exported, "timeline.md");
        assert!(timeline.contains("[test-log.txt](./assets/attachments/test-log.txt)"));
    }
}

// ============================================
// Snapshot links and URL rewriting
// ============================================

mod snapshot_links {
    use super::*;

    #[test]
    fn timeline_links_snapshots_through_the_step_map() {
        let mut lines = vec![context_line()];
        // The Test step has no snapshots of its own; its API child records
        // them against stepId.
        lines.push(
            r#"{"type":"before","callId":"step@1","startTime":1100.0,"class":"Test","method":"step","title":"Click go"}"#.to_string(),
        );
        lines.push(
            r#"{"type":"before","callId":"call@2","startTime":1110.0,"class":"Frame","method":"click","parentId":"step@1","stepId":"step@1","beforeSnapshot":"before@call@2"}"#.to_string(),
        );
        lines.push(r#"{"type":"after","callId":"call@2","endTime":1150.0,"afterSnapshot":"after@call@2"}"#.to_string());
        lines.push(r#"{"type":"after","callId":"step@1","endTime":1160.0}"#.to_string());
        for name in ["before@call@2", "after@call@2"] {
            lines.push(format!(
                concat!(
                    r#"{{"type":"frame-snapshot","snapshot":{{"snapshotName":"{name}","frameId":"main","#,
                    r#""frameUrl":"https://example.com/","timestamp":1120.0,"html":["HTML",["BODY","hi"]]}}}}"#
                ),
                name = name
            ));
        }
        let exported = export(&lines, &[]);

        let timeline = read(&exported, "timeline.md");
        assert!(
            timeline.contains("[before](./assets/snapshots/before@call@2.html)"),
            "{timeline}"
        );
        assert!(timeline.contains("[after](./assets/snapshots/after@call@2.html)"));
        assert!(exported.out.join("assets/snapshots/before@call@2.html").exists());
    }

    #[test]
    fn snapshot_urls_rewrite_to_extracted_resources() {
        let mut lines = vec![context_line()];
        lines.extend(test_step("call@1", "Load page", 1100.0, 1200.0));
        lines.push(
            concat!(
                r#"{"type":"resource-snapshot","snapshot":{"request":{"method":"GET","url":"https://example.com/a/b.png"},"#,
                r#""response":{"status":200,"content":{"size":9,"_sha1":"imagehash"}}}}"#
            )
            .to_string(),
        );
        lines.push(
            concat!(
                r#"{"type":"frame-snapshot","snapshot":{"snapshotName":"after@call@1","frameId":"main","#,
                r#""frameUrl":"https://example.com/","timestamp":1150.0,"#,
                r#""html":["HTML",["HEAD",["STYLE","body { background: url(\"/a/b.png\"); }"]],"#,
                r#"["BODY",["IMG",{"src":"/a/b.png"}]]]}}"#
            )
            .to_string(),
        );
        let resources: Vec<(&str, &[u8])> = vec![("imagehash", b"png bytes")];
        let exported = export(&lines, &resources);

        let html = fs::read_to_string(
            exported.out.join("assets/snapshots/after@call@1.html"),
        )
        .unwrap();
        assert!(html.contains(r#"<IMG src="../resources/imagehash">"#), "{html}");
        assert!(html.contains("background: url('../resources/imagehash')"));
        assert!(exported.out.join("assets/resources/imagehash").exists());

        let network = read(&exported, "network.md");
        assert!(network.contains("[view](./assets/resources/imagehash)"));
    }
}
