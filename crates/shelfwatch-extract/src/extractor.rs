//! Top-level snapshot extraction.
//!
//! `extract` never fails: a page that yields nothing produces a snapshot
//! full of `None`s plus notes explaining what each strategy saw. Downstream
//! ingestion tolerates every gap.

use shelfwatch_core::{FetchResult, ProductSnapshot};

use crate::dom::Dom;
use crate::dynamic::detect_dynamic_content;
use crate::embedded_json::harvest_embedded_json;
use crate::strategy::ExtractionContext;
use crate::{meta, price, stock, variants, MAX_HTML_BYTES};

/// Build a [`ProductSnapshot`] from a fetch result.
#[must_use]
pub fn extract(result: &FetchResult) -> ProductSnapshot {
    let mut snapshot = ProductSnapshot::empty(result.original_url.clone(), result.fetched_at);
    snapshot.final_url = result.final_url.clone();

    let Some(html) = result.html() else {
        snapshot
            .notes
            .push("no html in fetch result; nothing to extract".to_string());
        return snapshot;
    };

    let html = truncated(html);

    // JSON is harvested from the full document before the DOM index strips
    // scripts; the strategies get both views.
    let json_blobs = harvest_embedded_json(html);
    let dom = Dom::parse_stripped(html);
    let ctx = ExtractionContext {
        dom: &dom,
        json_blobs: &json_blobs,
        html,
    };

    snapshot.title = meta::extract_title(&ctx);
    snapshot.description = meta::extract_description(&ctx);
    snapshot.images = meta::extract_images(&ctx);
    snapshot.variants = variants::extract_variants(&ctx, &mut snapshot.notes);
    snapshot.pricing = price::extract_price(&ctx, &mut snapshot.notes);
    snapshot.stock = stock::extract_stock(&ctx, &mut snapshot.notes);

    let signals = detect_dynamic_content(html, &dom);
    snapshot.metadata.is_likely_dynamic = signals.is_likely_dynamic;
    snapshot.metadata.dynamic_indicators = signals.indicators;
    snapshot.metadata.json_blob_count = json_blobs.len();

    if snapshot.title.is_none() {
        snapshot.notes.push("title: all strategies missed".to_string());
    }

    tracing::debug!(
        url = %snapshot.url,
        title = snapshot.title.as_deref().unwrap_or("<none>"),
        variants = snapshot.variants.len(),
        has_price = snapshot.pricing.is_some(),
        has_stock = snapshot.stock.is_some(),
        dynamic = snapshot.metadata.is_likely_dynamic,
        "snapshot extracted"
    );

    snapshot
}

/// Byte-cap the input on a char boundary.
fn truncated(html: &str) -> &str {
    if html.len() <= MAX_HTML_BYTES {
        return html;
    }
    let mut cut = MAX_HTML_BYTES;
    while cut > 0 && !html.is_char_boundary(cut) {
        cut -= 1;
    }
    &html[..cut]
}
