//! A lightweight element index over raw HTML.
//!
//! This is not a spec-compliant DOM. One regex pass tokenizes tags into an
//! ordered list with attribute maps and byte offsets; inner text is computed
//! on demand by scanning forward to the matching close tag. Malformed input
//! degrades to a smaller (possibly empty) index, never an error, which is
//! exactly the tolerance the extraction cascades need.

use regex::Regex;

use crate::text::{collapse_whitespace, decode_entities, normalize_document, strip_tags};
use crate::MAX_HTML_BYTES;

/// Cap on computed inner text per element. Strategy matching only ever needs
/// the leading copy, and some pages wrap megabytes in a single wrapper div.
const TEXT_CAP: usize = 600;

/// Tags that never carry content and may omit a closing tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Open,
    Close,
}

#[derive(Debug, Clone)]
struct TagToken {
    kind: TagKind,
    tag: String,
    attrs: Vec<(String, String)>,
    /// Byte offset of the `<`.
    start: usize,
    /// Byte offset just past the `>`.
    end: usize,
    self_closing: bool,
}

/// Queryable element index over one document.
pub struct Dom {
    html: String,
    tokens: Vec<TagToken>,
    open_indices: Vec<usize>,
}

impl Dom {
    /// Parse a document, keeping script and style content in place.
    #[must_use]
    pub fn parse(html: &str) -> Self {
        Self::parse_inner(html, false)
    }

    /// Parse a document with `<script>` and `<style>` bodies removed first.
    /// Used once embedded JSON has already been harvested, so strategy text
    /// matching never trips over serialized state.
    #[must_use]
    pub fn parse_stripped(html: &str) -> Self {
        Self::parse_inner(html, true)
    }

    fn parse_inner(html: &str, strip_scripts_and_styles: bool) -> Self {
        let mut doc = normalize_document(html);
        if doc.len() > MAX_HTML_BYTES {
            let mut cut = MAX_HTML_BYTES;
            while cut > 0 && !doc.is_char_boundary(cut) {
                cut -= 1;
            }
            doc.truncate(cut);
        }

        let comments = Regex::new(r"(?s)<!--.*?-->").expect("valid comment regex");
        let mut doc = comments.replace_all(&doc, " ").into_owned();

        if strip_scripts_and_styles {
            let scripts =
                Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("valid script regex");
            let styles = Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("valid style regex");
            doc = scripts.replace_all(&doc, " ").into_owned();
            doc = styles.replace_all(&doc, " ").into_owned();
        }

        let tag_re = Regex::new(r#"<(/?)([a-zA-Z][a-zA-Z0-9:-]*)((?:"[^"]*"|'[^']*'|[^>"'])*)>"#)
            .expect("valid tag regex");
        let attr_re = Regex::new(
            r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s/>]+)))?"#,
        )
        .expect("valid attribute regex");

        let mut tokens = Vec::new();
        let mut open_indices = Vec::new();

        for cap in tag_re.captures_iter(&doc) {
            let whole = cap.get(0).expect("match 0");
            let closing = !cap[1].is_empty();
            let tag = cap[2].to_lowercase();
            let blob = cap.get(3).map_or("", |m| m.as_str());

            if closing {
                tokens.push(TagToken {
                    kind: TagKind::Close,
                    tag,
                    attrs: Vec::new(),
                    start: whole.start(),
                    end: whole.end(),
                    self_closing: false,
                });
                continue;
            }

            let mut attrs = Vec::new();
            for attr_cap in attr_re.captures_iter(blob) {
                let name = attr_cap[1].to_lowercase();
                let value = attr_cap
                    .get(2)
                    .or_else(|| attr_cap.get(3))
                    .or_else(|| attr_cap.get(4))
                    .map_or(String::new(), |m| decode_entities(m.as_str()));
                attrs.push((name, value));
            }

            let self_closing =
                blob.trim_end().ends_with('/') || VOID_TAGS.contains(&tag.as_str());

            open_indices.push(tokens.len());
            tokens.push(TagToken {
                kind: TagKind::Open,
                tag,
                attrs,
                start: whole.start(),
                end: whole.end(),
                self_closing,
            });
        }

        Self {
            html: doc,
            tokens,
            open_indices,
        }
    }

    /// The processed document this index was built over.
    #[must_use]
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Every element in document order.
    pub fn elements(&self) -> impl Iterator<Item = ElementRef<'_>> {
        self.open_indices.iter().map(move |&token| ElementRef {
            dom: self,
            token,
        })
    }

    /// Elements with the given tag name (lowercase).
    #[must_use]
    pub fn by_tag(&self, tag: &str) -> Vec<ElementRef<'_>> {
        self.elements().filter(|e| e.tag() == tag).collect()
    }

    /// Elements whose `class` attribute contains `needle` (case-insensitive).
    #[must_use]
    pub fn by_class_containing(&self, needle: &str) -> Vec<ElementRef<'_>> {
        self.elements().filter(|e| e.class_contains(needle)).collect()
    }

    /// Elements carrying the named attribute at all.
    #[must_use]
    pub fn by_attr(&self, name: &str) -> Vec<ElementRef<'_>> {
        self.elements().filter(|e| e.has_attr(name)).collect()
    }

    /// Elements whose named attribute equals `value` (case-insensitive).
    #[must_use]
    pub fn by_attr_value(&self, name: &str, value: &str) -> Vec<ElementRef<'_>> {
        self.elements()
            .filter(|e| {
                e.attr(name)
                    .is_some_and(|v| v.eq_ignore_ascii_case(value))
            })
            .collect()
    }

    /// `content` of the first `<meta>` whose `name` or `property` attribute
    /// equals `key` (case-insensitive). Empty content counts as a miss.
    #[must_use]
    pub fn meta_content(&self, key: &str) -> Option<String> {
        for element in self.elements().filter(|e| e.tag() == "meta") {
            let matches = element
                .attr("name")
                .or_else(|| element.attr("property"))
                .is_some_and(|v| v.eq_ignore_ascii_case(key));
            if matches {
                if let Some(content) = element.attr("content").map(|c| collapse_whitespace(&c)) {
                    if !content.is_empty() {
                        return Some(content);
                    }
                }
            }
        }
        None
    }

    /// First non-empty inner text among elements with the given tag.
    #[must_use]
    pub fn first_text(&self, tag: &str) -> Option<String> {
        self.by_tag(tag)
            .into_iter()
            .map(|e| e.text())
            .find(|t| !t.is_empty())
    }

    /// Inner byte range of an open token: from the end of the opening tag to
    /// the start of its matching close. Unclosed elements run to the next
    /// sibling of the same tag, or the end of the document.
    fn inner_range(&self, open_idx: usize) -> Option<(usize, usize)> {
        let open = &self.tokens[open_idx];
        if open.self_closing {
            return None;
        }

        let mut depth = 1u32;
        for token in &self.tokens[open_idx + 1..] {
            if token.tag != open.tag {
                continue;
            }
            match token.kind {
                TagKind::Open if !token.self_closing => {
                    // An unclosed sibling of the same tag implies the browser
                    // auto-closed ours here.
                    if depth == 1 && is_auto_closing(&open.tag) {
                        return Some((open.end, token.start));
                    }
                    depth += 1;
                }
                TagKind::Open => {}
                TagKind::Close => {
                    depth -= 1;
                    if depth == 0 {
                        return Some((open.end, token.start));
                    }
                }
            }
        }

        Some((open.end, self.html.len()))
    }
}

/// Tags the HTML parser auto-closes on a following sibling of the same name.
fn is_auto_closing(tag: &str) -> bool {
    matches!(tag, "p" | "li" | "option" | "tr" | "td" | "th" | "dt" | "dd")
}

/// A borrowed view of one element in the index.
#[derive(Clone, Copy)]
pub struct ElementRef<'a> {
    dom: &'a Dom,
    token: usize,
}

impl ElementRef<'_> {
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.dom.tokens[self.token].tag
    }

    /// Attribute value (entities decoded), `None` when absent. An attribute
    /// present without a value yields an empty string.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<String> {
        self.dom.tokens[self.token]
            .attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.dom.tokens[self.token].attrs.iter().any(|(n, _)| n == name)
    }

    #[must_use]
    pub fn class_contains(&self, needle: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.to_lowercase().contains(&needle.to_lowercase()))
    }

    #[must_use]
    pub fn id_contains(&self, needle: &str) -> bool {
        self.attr("id")
            .is_some_and(|c| c.to_lowercase().contains(&needle.to_lowercase()))
    }

    /// Inner text: markup stripped, entities decoded, whitespace collapsed,
    /// capped at a strategy-friendly length.
    #[must_use]
    pub fn text(&self) -> String {
        let Some((start, end)) = self.dom.inner_range(self.token) else {
            return String::new();
        };
        if start >= end {
            return String::new();
        }
        let mut text = decode_entities(&strip_tags(&self.dom.html[start..end]));
        if text.len() > TEXT_CAP {
            let mut cut = TEXT_CAP;
            while cut > 0 && !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
        }
        text
    }

    /// Byte offset of the opening tag, for context-window scoring.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.dom.tokens[self.token].start
    }

    /// Raw markup between this element's opening tag and its matching close,
    /// for targeted sub-parsing (e.g. `<option>`s inside a `<select>`).
    #[must_use]
    pub fn inner_html(&self) -> &str {
        match self.dom.inner_range(self.token) {
            Some((start, end)) if start < end => &self.dom.html[start..end],
            _ => "",
        }
    }

    /// Raw document slice around this element, used to judge surrounding
    /// copy (e.g. whether an email input sits in notify-me context).
    #[must_use]
    pub fn context_window(&self, radius: usize) -> &str {
        let token = &self.dom.tokens[self.token];
        let mut start = token.start.saturating_sub(radius);
        let mut end = (token.end + radius).min(self.dom.html.len());
        while start > 0 && !self.dom.html.is_char_boundary(start) {
            start -= 1;
        }
        while end < self.dom.html.len() && !self.dom.html.is_char_boundary(end) {
            end += 1;
        }
        &self.dom.html[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head>
        <meta property="og:title" content="Test Tee &amp; Friends">
        <title>Test Tee | Shop</title>
    </head><body>
        <h1 class="product-title">Test Tee</h1>
        <div class="Price-Box current-price" id="main-price" data-price="29.99">$29.99</div>
        <button class="add-to-cart" disabled>Add to Cart</button>
        <p>First para<p>Second para</p>
        <img src="/img/a.jpg">
        <select name="size"><option value="">Choose</option><option value="M">M</option></select>
    </body></html>"#;

    #[test]
    fn finds_elements_by_tag() {
        let dom = Dom::parse(PAGE);
        assert_eq!(dom.by_tag("h1").len(), 1);
        assert_eq!(dom.by_tag("option").len(), 2);
    }

    #[test]
    fn inner_text_is_stripped_and_collapsed() {
        let dom = Dom::parse(PAGE);
        assert_eq!(dom.first_text("h1").as_deref(), Some("Test Tee"));
    }

    #[test]
    fn meta_content_matches_name_or_property() {
        let dom = Dom::parse(PAGE);
        assert_eq!(
            dom.meta_content("og:title").as_deref(),
            Some("Test Tee & Friends")
        );
        assert!(dom.meta_content("og:description").is_none());
    }

    #[test]
    fn class_matching_is_case_insensitive_substring() {
        let dom = Dom::parse(PAGE);
        let hits = dom.by_class_containing("price");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text(), "$29.99");
        assert!(hits[0].id_contains("price"));
    }

    #[test]
    fn valueless_attributes_are_present_but_empty() {
        let dom = Dom::parse(PAGE);
        let button = &dom.by_tag("button")[0];
        assert!(button.has_attr("disabled"));
        assert_eq!(button.attr("disabled").as_deref(), Some(""));
    }

    #[test]
    fn data_attributes_are_reachable() {
        let dom = Dom::parse(PAGE);
        let hits = dom.by_attr("data-price");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].attr("data-price").as_deref(), Some("29.99"));
    }

    #[test]
    fn unclosed_paragraph_auto_closes_at_sibling() {
        let dom = Dom::parse(PAGE);
        let paras = dom.by_tag("p");
        assert_eq!(paras[0].text(), "First para");
        assert_eq!(paras[1].text(), "Second para");
    }

    #[test]
    fn parse_stripped_removes_script_content() {
        let html = "<html><body><script>var price = '$99.99';</script><p>real</p></body></html>";
        let dom = Dom::parse_stripped(html);
        assert!(!dom.html().contains("99.99"));
        assert_eq!(dom.first_text("p").as_deref(), Some("real"));
    }

    #[test]
    fn malformed_input_yields_best_effort_index() {
        let dom = Dom::parse("<<<>>> not html at all <div>ok</div");
        // The opening tag still indexes; the unterminated close never does.
        assert_eq!(dom.by_tag("div").len(), 1);
        assert!(dom.by_tag("span").is_empty());
    }

    #[test]
    fn empty_input_yields_empty_index() {
        let dom = Dom::parse("");
        assert_eq!(dom.elements().count(), 0);
    }

    #[test]
    fn comments_are_ignored() {
        let dom = Dom::parse("<html><body><!-- <div>ghost</div> --><div>real</div></body></html>");
        assert_eq!(dom.by_tag("div").len(), 1);
        assert_eq!(dom.by_tag("div")[0].text(), "real");
    }

    #[test]
    fn context_window_exposes_surrounding_markup() {
        let dom = Dom::parse(PAGE);
        let button = &dom.by_tag("button")[0];
        assert!(button.context_window(80).contains("main-price"));
    }
}
