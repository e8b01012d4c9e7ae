//! Title, description, and image waterfalls.
//!
//! Each is an ordered list of sources; the first non-empty answer wins.
//! Images instead accumulate across all sources into an ordered, deduped
//! list capped at [`MAX_IMAGES`](shelfwatch_core::MAX_IMAGES).

use serde_json::Value;

use shelfwatch_core::MAX_IMAGES;

use crate::strategy::ExtractionContext;
use crate::text::collapse_whitespace;

/// Depth bound when walking blobs for titles and images.
const MAX_DEPTH: usize = 6;

// ---------------------------------------------------------------------------
// Title
// ---------------------------------------------------------------------------

/// The §title waterfall: embedded JSON, social meta tags, product DOM
/// selectors, first `<h1>`, `meta[name=title]`, document title.
#[must_use]
pub fn extract_title(ctx: &ExtractionContext<'_>) -> Option<String> {
    if let Some(title) = json_title(ctx.json_blobs) {
        return Some(title);
    }
    if let Some(title) = ctx.dom.meta_content("og:title") {
        return Some(title);
    }
    if let Some(title) = ctx.dom.meta_content("twitter:title") {
        return Some(title);
    }

    for class in ["product-title", "product__title"] {
        if let Some(element) = ctx.dom.by_class_containing(class).into_iter().next() {
            let text = element.text();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    if let Some(element) = ctx.dom.by_attr_value("itemprop", "name").into_iter().next() {
        let text = element.text();
        if !text.is_empty() {
            return Some(text);
        }
    }

    if let Some(h1) = ctx.dom.first_text("h1") {
        return Some(h1);
    }
    if let Some(title) = ctx.dom.meta_content("title") {
        return Some(title);
    }

    ctx.dom.first_text("title").map(|t| {
        // Document titles append the site name: "Tee | Example Shop".
        let first = t.split(['|', '-']).next().unwrap_or(&t);
        collapse_whitespace(first)
    })
}

/// Product name from embedded JSON: JSON-LD `Product.name`, then a Shopify
/// `product.title`, then any non-typed object's `title`.
fn json_title(blobs: &[Value]) -> Option<String> {
    for blob in blobs {
        if let Some(name) = json_ld_product_name(blob) {
            return Some(name);
        }
    }
    for blob in blobs {
        let product = blob.get("product").unwrap_or(blob);
        if product.get("variants").is_some() {
            if let Some(title) = product.get("title").and_then(Value::as_str) {
                if !title.is_empty() {
                    return Some(title.to_string());
                }
            }
        }
    }
    for blob in blobs {
        if let Some(title) = untyped_title(blob, 0) {
            return Some(title);
        }
    }
    None
}

fn json_ld_product_name(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            if type_is_product(map.get("@type")) {
                if let Some(name) = map.get("name").and_then(Value::as_str) {
                    if !name.is_empty() {
                        return Some(name.to_string());
                    }
                }
            }
            map.get("@graph")
                .and_then(Value::as_array)
                .and_then(|graph| graph.iter().find_map(json_ld_product_name))
        }
        Value::Array(items) => items.iter().find_map(json_ld_product_name),
        _ => None,
    }
}

fn type_is_product(node_type: Option<&Value>) -> bool {
    match node_type {
        Some(Value::String(s)) => s.eq_ignore_ascii_case("product"),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .any(|s| s.eq_ignore_ascii_case("product")),
        _ => false,
    }
}

/// First `title` string on an object that carries no `@type` marker.
fn untyped_title(value: &Value, depth: usize) -> Option<String> {
    if depth > MAX_DEPTH {
        return None;
    }
    match value {
        Value::Object(map) => {
            if !map.contains_key("@type") {
                if let Some(title) = map.get("title").and_then(Value::as_str) {
                    if !title.is_empty() {
                        return Some(title.to_string());
                    }
                }
            }
            map.values().find_map(|v| untyped_title(v, depth + 1))
        }
        Value::Array(items) => items.iter().find_map(|v| untyped_title(v, depth + 1)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Description
// ---------------------------------------------------------------------------

/// `meta[name=description]` → `og:description` → `twitter:description`.
#[must_use]
pub fn extract_description(ctx: &ExtractionContext<'_>) -> Option<String> {
    ctx.dom
        .meta_content("description")
        .or_else(|| ctx.dom.meta_content("og:description"))
        .or_else(|| ctx.dom.meta_content("twitter:description"))
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// Accumulate image URLs from every known source, in precedence order,
/// normalized and capped.
#[must_use]
pub fn extract_images(ctx: &ExtractionContext<'_>) -> Vec<String> {
    let mut images = Vec::new();

    // Social meta tags first; they are curated.
    for key in ["og:image", "twitter:image"] {
        for element in ctx.dom.by_tag("meta") {
            let matches = element
                .attr("property")
                .or_else(|| element.attr("name"))
                .is_some_and(|v| v.eq_ignore_ascii_case(key));
            if matches {
                if let Some(content) = element.attr("content") {
                    push_image(&mut images, &content);
                }
            }
        }
    }

    // Embedded JSON: JSON-LD image fields, Shopify product.images.
    for blob in ctx.json_blobs {
        collect_json_images(blob, 0, &mut images);
    }

    // Product-gallery imagery, then the full <img> inventory.
    for element in ctx.dom.by_tag("img") {
        let curated = ["product", "gallery", "main"]
            .iter()
            .any(|n| element.class_contains(n) || element.id_contains(n));
        if !curated {
            continue;
        }
        for attr in ["src", "data-src"] {
            if let Some(url) = element.attr(attr) {
                push_image(&mut images, &url);
            }
        }
    }
    for element in ctx.dom.by_tag("img") {
        for attr in ["src", "data-src"] {
            if let Some(url) = element.attr(attr) {
                push_image(&mut images, &url);
            }
        }
        if let Some(srcset) = element.attr("srcset") {
            for entry in srcset.split(',') {
                if let Some(url) = entry.trim().split_whitespace().next() {
                    push_image(&mut images, url);
                }
            }
        }
    }

    images.truncate(MAX_IMAGES);
    images
}

/// Harvest `image`/`images` keys from a blob, any depth up to the bound.
fn collect_json_images(value: &Value, depth: usize, out: &mut Vec<String>) {
    if depth > MAX_DEPTH {
        return;
    }
    match value {
        Value::Object(map) => {
            for key in ["image", "images"] {
                if let Some(child) = map.get(key) {
                    image_urls_from(child, out);
                }
            }
            for child in map.values() {
                collect_json_images(child, depth + 1, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_json_images(item, depth + 1, out);
            }
        }
        _ => {}
    }
}

/// The forms an image value takes: a URL string, an array of either, or an
/// object keyed `url` / `contentUrl` / `src` / `originalSrc`.
fn image_urls_from(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(url) => push_image(out, url),
        Value::Array(items) => {
            for item in items {
                image_urls_from(item, out);
            }
        }
        Value::Object(map) => {
            for key in ["url", "contentUrl", "src", "originalSrc"] {
                if let Some(url) = map.get(key).and_then(Value::as_str) {
                    push_image(out, url);
                    break;
                }
            }
        }
        _ => {}
    }
}

/// Normalize and dedup: protocol-relative URLs become https, and only
/// absolute (`http…`) or root-relative (`/…`) URLs are kept.
fn push_image(images: &mut Vec<String>, url: &str) {
    let url = url.trim();
    if url.is_empty() {
        return;
    }
    let normalized = if let Some(rest) = url.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        url.to_string()
    };
    if !(normalized.starts_with("http") || normalized.starts_with('/')) {
        return;
    }
    if !images.contains(&normalized) {
        images.push(normalized);
    }
}
