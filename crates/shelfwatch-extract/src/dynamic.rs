//! Dynamic-content heuristic.
//!
//! Flags pages that look client-rendered so the check-run metadata can
//! explain thin extractions. Two or more indicators mark the page dynamic;
//! the flag never gates behavior.

use regex::Regex;

use crate::dom::Dom;
use crate::text::strip_tags;

/// Indicators needed to call a page dynamic.
const DYNAMIC_THRESHOLD: usize = 2;

/// Substrings that identify SPA frameworks in markup or script URLs.
const FRAMEWORK_MARKERS: &[&str] = &[
    "__NEXT_DATA__",
    "data-reactroot",
    "data-react-helmet",
    "ng-app",
    "ng-version",
    "x-data",
    "v-if",
    "v-for",
    "data-v-app",
];

const SPA_NAME_MARKERS: &[&str] = &["react", "vue", "angular", "svelte", "next", "nuxt", "ember"];

const STATE_MARKERS: &[&str] = &["__INITIAL_STATE__", "window.initialState", "\"initialState\""];

/// Outcome of the heuristic: the flag plus the indicators that fired.
#[derive(Debug, Clone, Default)]
pub struct DynamicSignals {
    pub is_likely_dynamic: bool,
    pub indicators: Vec<String>,
}

/// Judge the raw (unstripped) document.
#[must_use]
pub fn detect_dynamic_content(html: &str, dom: &Dom) -> DynamicSignals {
    let mut indicators = Vec::new();

    let body_inner = body_inner(html);
    if body_inner.len() < 500 {
        indicators.push("body under 500 chars".to_string());
    }

    let script_count = count_matches(html, r"(?i)<script\b");
    let element_count = dom.elements().count();
    if element_count > 0 && script_count * 2 > element_count {
        indicators.push("majority of markup is script tags".to_string());
    }

    if let Some(marker) = FRAMEWORK_MARKERS.iter().find(|m| html.contains(*m)) {
        indicators.push(format!("framework marker {marker}"));
    }

    let external_scripts = count_matches(html, r#"(?i)<script[^>]+src\s*="#);
    if external_scripts > 10 {
        indicators.push(format!("{external_scripts} external scripts"));
    }

    if strip_tags(&body_inner).len() < 200 {
        indicators.push("under 200 chars visible text".to_string());
    }

    let empty_divs = count_matches(html, r#"(?i)<div[^>]*\bid\s*=\s*"[^"]+"[^>]*>\s*</div>"#);
    if empty_divs > 5 {
        indicators.push(format!("{empty_divs} empty mount-point divs"));
    }

    let noscript_len = Regex::new(r"(?is)<noscript[^>]*>(.*?)</noscript>")
        .expect("valid noscript regex")
        .captures_iter(html)
        .map(|c| c.get(1).map_or(0, |m| m.as_str().len()))
        .sum::<usize>();
    if noscript_len > 200 {
        indicators.push("substantial noscript content".to_string());
    }

    let lower = html.to_lowercase();
    if let Some(name) = SPA_NAME_MARKERS
        .iter()
        .find(|n| script_srcs_mention(&lower, n))
    {
        indicators.push(format!("spa framework {name}"));
    }

    if let Some(marker) = STATE_MARKERS.iter().find(|m| html.contains(*m)) {
        indicators.push(format!("client state json {marker}"));
    }

    DynamicSignals {
        is_likely_dynamic: indicators.len() >= DYNAMIC_THRESHOLD,
        indicators,
    }
}

fn body_inner(html: &str) -> String {
    Regex::new(r"(?is)<body[^>]*>(.*?)</body>")
        .expect("valid body regex")
        .captures(html)
        .and_then(|c| c.get(1))
        .map_or_else(|| html.to_string(), |m| m.as_str().to_string())
}

fn count_matches(html: &str, pattern: &str) -> usize {
    Regex::new(pattern)
        .expect("valid count regex")
        .find_iter(html)
        .count()
}

/// Whether any script src URL mentions the framework name.
fn script_srcs_mention(lower_html: &str, name: &str) -> bool {
    let src_re = Regex::new(r#"(?i)<script[^>]+src\s*=\s*["']([^"']+)["']"#)
        .expect("valid script-src regex");
    let found = src_re
        .captures_iter(lower_html)
        .any(|c| c.get(1).is_some_and(|m| m.as_str().contains(name)));
    found
}
