//! Price extraction cascade: embedded JSON first, then price-ish DOM
//! elements, then raw-text heuristics.

mod dom;
mod heuristic;
mod json;

use rust_decimal::Decimal;

use shelfwatch_core::PriceShell;

use crate::strategy::{run_cascade, ExtractionContext, Strategy};

pub use dom::DomPriceStrategy;
pub use heuristic::HeuristicPriceStrategy;
pub use json::JsonPriceStrategy;

/// What a price strategy recovers; the cascade wrapper attaches the
/// strategy name when building the [`PriceShell`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceFinding {
    pub amount: Decimal,
    pub currency: Option<String>,
    pub raw: String,
}

/// A scored candidate used inside strategies while ranking evidence.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub finding: PriceFinding,
    pub score: i32,
}

/// Highest score wins; the earliest candidate takes ties.
pub(crate) fn best_candidate(candidates: Vec<Candidate>) -> Option<PriceFinding> {
    candidates
        .into_iter()
        .max_by_key(|c| c.score)
        .map(|c| c.finding)
}

/// Run the full price cascade.
pub fn extract_price(
    ctx: &ExtractionContext<'_>,
    notes: &mut Vec<String>,
) -> Option<PriceShell> {
    let json = JsonPriceStrategy;
    let dom = DomPriceStrategy;
    let heuristic = HeuristicPriceStrategy;
    let strategies: [&dyn Strategy<PriceFinding>; 3] = [&json, &dom, &heuristic];

    run_cascade(&strategies, ctx, notes).map(|hit| PriceShell {
        amount: hit.value.amount,
        currency: hit.value.currency,
        raw: hit.value.raw,
        strategy: hit.strategy.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Dom;

    fn ctx_for<'a>(dom: &'a Dom, blobs: &'a [serde_json::Value], html: &'a str) -> ExtractionContext<'a> {
        ExtractionContext {
            dom,
            json_blobs: blobs,
            html,
        }
    }

    #[test]
    fn json_beats_dom_and_heuristics() {
        let html = r#"<html><body><div class="price">$99.00</div></body></html>"#;
        let dom = Dom::parse(html);
        let blobs = vec![serde_json::json!({"price": "29.99", "currency": "USD"})];

        let mut notes = Vec::new();
        let shell = extract_price(&ctx_for(&dom, &blobs, html), &mut notes).expect("price");
        assert_eq!(shell.amount, rust_decimal::Decimal::new(2999, 2));
        assert_eq!(shell.strategy, "json-price-strategy");
    }

    #[test]
    fn dom_fills_in_when_json_is_empty() {
        let html = r#"<html><body><div class="product-price">$49.50</div></body></html>"#;
        let dom = Dom::parse(html);
        let blobs = Vec::new();

        let mut notes = Vec::new();
        let shell = extract_price(&ctx_for(&dom, &blobs, html), &mut notes).expect("price");
        assert_eq!(shell.amount, rust_decimal::Decimal::new(4950, 2));
        assert_eq!(shell.strategy, "dom-price-strategy");
        assert!(notes.iter().any(|n| n.starts_with("json-price-strategy:")));
    }

    #[test]
    fn heuristics_are_the_last_resort() {
        let html = "<html><body><span>now 19.99 only today</span></body></html>";
        let dom = Dom::parse(html);
        let blobs = Vec::new();

        let mut notes = Vec::new();
        let shell = extract_price(&ctx_for(&dom, &blobs, html), &mut notes).expect("price");
        assert_eq!(shell.amount, rust_decimal::Decimal::new(1999, 2));
    }

    #[test]
    fn no_evidence_yields_none() {
        let html = "<html><body><p>a page about nothing with no numerals</p></body></html>";
        let dom = Dom::parse(html);
        let blobs = Vec::new();

        let mut notes = Vec::new();
        assert!(extract_price(&ctx_for(&dom, &blobs, html), &mut notes).is_none());
        assert_eq!(notes.len(), 3, "every strategy leaves a note: {notes:?}");
    }
}
