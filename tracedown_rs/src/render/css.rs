//! CSS `url(...)` rewriting for inline styles and `<style>` text.
//!
//! External stylesheets delivered as network resources are served verbatim;
//! only inline CSS is rewritten so its references resolve inside the export
//! tree.

use std::sync::OnceLock;

use regex::Regex;

/// Matches `url(<optional quote><body><same quote>)`. The body is captured
/// with its quotes; stripping happens in code because the regex crate has no
/// backreferences.
fn regex_css_url() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"url\(\s*("[^"]*"|'[^']*'|[^)'"\s]*)\s*\)"#).expect("valid regex literal")
    })
}

/// Replace every `url(...)` body via `rewrite`. Output is always
/// single-quoted: `url('<rewritten>')`.
pub(crate) fn rewrite_css_urls(text: &str, rewrite: &mut dyn FnMut(&str) -> String) -> String {
    regex_css_url()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let body = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let url = body
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .or_else(|| body.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
                .unwrap_or(body);
            format!("url('{}')", rewrite(url))
        })
        .into_owned()
}
