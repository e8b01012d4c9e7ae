//! Embedded JSON harvesting.
//!
//! Product pages bury structured data in several places: JSON-LD blocks,
//! `application/json` script tags, framework state assignments, and bare
//! object literals inside otherwise-empty scripts. This module pulls all of
//! them into one untyped blob list; parse failures are silently dropped.

use regex::Regex;
use serde_json::Value;

/// JS keywords that mark a script body as code rather than a data literal.
const CODE_PREFIXES: &[&str] = &[
    "function", "var", "let", "const", "class", "import", "export",
];

/// Minimum size for a bare object/array literal to be worth keeping.
const MIN_LITERAL_LEN: usize = 20;

/// Collect every embedded JSON value from the document, in discovery order.
#[must_use]
pub fn harvest_embedded_json(html: &str) -> Vec<Value> {
    let mut blobs = Vec::new();

    let script_re =
        Regex::new(r"(?is)<script([^>]*)>(.*?)</script>").expect("valid script regex");

    for cap in script_re.captures_iter(html) {
        let attrs = cap.get(1).map_or("", |m| m.as_str()).to_lowercase();
        let body = cap.get(2).map_or("", |m| m.as_str()).trim();
        if body.is_empty() {
            continue;
        }

        if attrs.contains("application/ld+json") {
            if let Ok(value) = serde_json::from_str::<Value>(body) {
                match value {
                    // Arrays of JSON-LD nodes are flattened.
                    Value::Array(items) => blobs.extend(items),
                    other => blobs.push(other),
                }
            }
            continue;
        }

        if attrs.contains("application/json") {
            if let Ok(value) = serde_json::from_str::<Value>(body) {
                blobs.push(value);
            }
            continue;
        }

        if is_code_script(body) {
            continue;
        }

        if let Some(literal) = first_balanced_literal(body) {
            if literal.len() >= MIN_LITERAL_LEN {
                if let Ok(value) = serde_json::from_str::<Value>(literal) {
                    blobs.push(value);
                }
            }
        }
    }

    for marker in ["__NEXT_DATA__", "Product.json"] {
        if let Some(value) = assignment_literal(html, marker) {
            blobs.push(value);
        }
    }

    blobs
}

/// Whether a script body starts with a JS declaration keyword.
fn is_code_script(body: &str) -> bool {
    let head = body.trim_start();
    CODE_PREFIXES.iter().any(|kw| {
        head.starts_with(kw)
            && head[kw.len()..]
                .chars()
                .next()
                .is_none_or(|c| !c.is_alphanumeric() && c != '_')
    })
}

/// The first standalone `{...}` or `[...]` literal in a script body.
fn first_balanced_literal(body: &str) -> Option<&str> {
    let start = body.find(['{', '['])?;
    balanced_slice(body, start)
}

/// Parse `marker = {...};` assignments anywhere in the document.
fn assignment_literal(html: &str, marker: &str) -> Option<Value> {
    let assign_re = Regex::new(&format!(
        r"{}\s*=\s*",
        regex::escape(marker)
    ))
    .expect("valid assignment regex");

    let m = assign_re.find(html)?;
    let rest = &html[m.end()..];
    let offset = rest.find('{')?;
    // Literal must follow the assignment immediately (whitespace only).
    if !rest[..offset].trim().is_empty() {
        return None;
    }
    let literal = balanced_slice(rest, offset)?;
    serde_json::from_str(literal).ok()
}

/// Slice from `start` (pointing at `{` or `[`) through the matching
/// terminator, tracking string boundaries and escapes.
fn balanced_slice(s: &str, start: usize) -> Option<&str> {
    let bytes = s.as_bytes();
    let open = bytes[start];
    let close = match open {
        b'{' => b'}',
        b'[' => b']',
        _ => return None,
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            _ if b == open => depth += 1,
            _ if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ld_json_blocks_are_parsed() {
        let html = r#"<script type="application/ld+json">{"@type":"Product","name":"Tee"}</script>"#;
        let blobs = harvest_embedded_json(html);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0]["name"], "Tee");
    }

    #[test]
    fn ld_json_arrays_are_flattened() {
        let html = r#"<script type="application/ld+json">[{"@type":"WebPage"},{"@type":"Product"}]</script>"#;
        let blobs = harvest_embedded_json(html);
        assert_eq!(blobs.len(), 2);
    }

    #[test]
    fn application_json_blocks_are_parsed() {
        let html = r#"<script type="application/json" id="product-json">{"product":{"title":"Tee"}}</script>"#;
        let blobs = harvest_embedded_json(html);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0]["product"]["title"], "Tee");
    }

    #[test]
    fn bare_object_literal_in_plain_script_is_kept() {
        let html = r#"<script>{"inventory": {"status": "in stock", "qty": 3}}</script>"#;
        let blobs = harvest_embedded_json(html);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0]["inventory"]["qty"], 3);
    }

    #[test]
    fn code_scripts_are_skipped() {
        let html = r#"<script>var state = {"price": 10.0, "currency": "USD"};</script>"#;
        assert!(harvest_embedded_json(html).is_empty());
    }

    #[test]
    fn tiny_literals_are_skipped() {
        let html = r"<script>{}</script>";
        assert!(harvest_embedded_json(html).is_empty());
    }

    #[test]
    fn next_data_assignment_is_harvested() {
        let html = r#"<script>window.__WHATEVER__ = 1;</script>
            __NEXT_DATA__ = {"props": {"pageProps": {"price": "29.99"}}};"#;
        let blobs = harvest_embedded_json(html);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0]["props"]["pageProps"]["price"], "29.99");
    }

    #[test]
    fn product_json_assignment_is_harvested() {
        let html = r#"Product.json = {"id": 1, "title": "Tee", "variants": []};"#;
        let blobs = harvest_embedded_json(html);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0]["title"], "Tee");
    }

    #[test]
    fn malformed_json_is_silently_dropped() {
        let html = r#"<script type="application/ld+json">{oops}</script>
            <script type="application/json">[1, 2</script>"#;
        assert!(harvest_embedded_json(html).is_empty());
    }

    #[test]
    fn braces_inside_strings_do_not_break_balancing() {
        let body = r#"{"note": "a } inside", "ok": true}"#;
        assert_eq!(first_balanced_literal(body), Some(body));
    }
}
