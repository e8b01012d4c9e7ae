//! Text cleanup helpers shared by the DOM index and the strategies.

use regex::Regex;

/// Collapse every run of whitespace (including newlines and tabs) to a
/// single space and trim the ends.
#[must_use]
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase and strip everything but letters, digits, and single spaces.
/// Used for fuzzy phrase comparisons where punctuation is noise.
#[must_use]
pub fn normalize_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else {
            out.push(' ');
        }
    }
    collapse_whitespace(&out)
}

/// Remove all markup, leaving visible text.
#[must_use]
pub fn strip_tags(input: &str) -> String {
    let tags = Regex::new(r"(?is)<[^>]+>").expect("valid tag-strip regex");
    collapse_whitespace(&tags.replace_all(input, " "))
}

/// Decode the handful of HTML entities that matter for product copy.
#[must_use]
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    input
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
}

/// Normalize line endings and collapse runs of more than two blank lines,
/// applied before the input reaches the tag tokenizer.
#[must_use]
pub fn normalize_document(input: &str) -> String {
    let unified = input.replace("\r\n", "\n").replace('\r', "\n");
    let blank_runs = Regex::new(r"\n{3,}").expect("valid blank-line regex");
    blank_runs.replace_all(&unified, "\n\n").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_whitespace_flattens_everything() {
        assert_eq!(collapse_whitespace("  a\t\tb\n\n c  "), "a b c");
    }

    #[test]
    fn normalize_text_lowercases_and_drops_punctuation() {
        assert_eq!(normalize_text("Add to Cart!"), "add to cart");
        assert_eq!(normalize_text("IN-STOCK (ships today)"), "in stock ships today");
    }

    #[test]
    fn strip_tags_leaves_visible_text() {
        assert_eq!(strip_tags("<div><b>Only</b> 3 left</div>"), "Only 3 left");
    }

    #[test]
    fn decode_entities_handles_common_cases() {
        assert_eq!(decode_entities("Tom &amp; Jerry&#39;s"), "Tom & Jerry's");
        assert_eq!(decode_entities("plain"), "plain");
    }

    #[test]
    fn normalize_document_unifies_line_endings() {
        assert_eq!(normalize_document("a\r\nb\r c"), "a\nb\n c");
        assert_eq!(normalize_document("a\n\n\n\n\nb"), "a\n\nb");
    }
}
