//! Stock extraction cascade.
//!
//! Precedence order: the notify-me detector (retailers that replace the
//! purchase control with a restock-alert form), embedded JSON, DOM text
//! patterns, purchase-button state, and finally raw-text heuristics.

mod button;
mod dom;
mod heuristic;
mod json;
mod notify_me;

use shelfwatch_core::{StockShell, StockStatus};

use crate::strategy::{run_cascade, ExtractionContext, Strategy};
use crate::text::normalize_text;

pub use button::ButtonStockStrategy;
pub use dom::DomStockStrategy;
pub use heuristic::HeuristicStockStrategy;
pub use json::JsonStockStrategy;
pub use notify_me::NotifyMeStockStrategy;

/// What a stock strategy recovers; the cascade wrapper attaches the
/// strategy name when building the [`StockShell`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockFinding {
    pub status: StockStatus,
    pub raw: Option<String>,
}

/// Run the full stock cascade.
pub fn extract_stock(
    ctx: &ExtractionContext<'_>,
    notes: &mut Vec<String>,
) -> Option<StockShell> {
    let notify_me = NotifyMeStockStrategy;
    let json = JsonStockStrategy;
    let dom = DomStockStrategy;
    let button = ButtonStockStrategy;
    let heuristic = HeuristicStockStrategy;
    let strategies: [&dyn Strategy<StockFinding>; 5] =
        [&notify_me, &json, &dom, &button, &heuristic];

    run_cascade(&strategies, ctx, notes).map(|hit| StockShell {
        status: hit.value.status,
        raw: hit.value.raw,
        strategy: hit.strategy.to_string(),
    })
}

/// Map free text (or a schema.org availability IRI) to a status.
///
/// IRI fragments are checked first because camel-cased forms survive no
/// whitespace normalization; plain phrases are substring-matched on the
/// normalized text, most-specific first.
#[must_use]
pub(crate) fn status_from_text(text: &str) -> Option<StockStatus> {
    // schema.org availability IRIs and their bare enum spellings.
    for (marker, status) in [
        ("OutOfStock", StockStatus::OutOfStock),
        ("SoldOut", StockStatus::OutOfStock),
        ("Discontinued", StockStatus::OutOfStock),
        ("BackOrder", StockStatus::Backorder),
        ("PreOrder", StockStatus::Preorder),
        ("PreSale", StockStatus::Preorder),
        ("LimitedAvailability", StockStatus::LowStock),
        ("InStoreOnly", StockStatus::Unknown),
        ("InStock", StockStatus::InStock),
    ] {
        if text.contains(marker) {
            return Some(status);
        }
    }

    let normalized = normalize_text(text);
    let has = |needle: &str| normalized.contains(needle);

    if has("sold out") || has("out of stock") || has("unavailable") || has("no longer available")
    {
        return Some(StockStatus::OutOfStock);
    }
    if has("low stock") || has("limited stock") || has("few left") || left_count_is_low(&normalized)
    {
        return Some(StockStatus::LowStock);
    }
    if has("backorder") || has("back order") {
        return Some(StockStatus::Backorder);
    }
    if has("preorder") || has("pre order") || has("presale") || has("pre sale") {
        return Some(StockStatus::Preorder);
    }
    if has("in stock") || has("instock") || has("available now") || has("add to cart") {
        return Some(StockStatus::InStock);
    }
    None
}

/// `"only 3 left"` style phrases read as low stock.
fn left_count_is_low(normalized: &str) -> bool {
    normalized.contains(" left") && normalized.split_whitespace().any(|w| w.parse::<u32>().is_ok())
}
