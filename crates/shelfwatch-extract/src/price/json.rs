//! Price recovery from embedded JSON blobs.

use rust_decimal::Decimal;
use serde_json::Value;

use crate::money;
use crate::strategy::{ExtractionContext, Strategy, StrategyOutcome};

use super::{best_candidate, Candidate, PriceFinding};

/// Maximum recursion depth when walking a blob.
const MAX_DEPTH: usize = 10;

/// Lowercase key fragments that mark a value as price-like.
const PRICE_KEYS: &[&str] = &[
    "price",
    "price_amount",
    "pricevalue",
    "amount",
    "cost",
    "value",
    "current_price",
    "sale_price",
    "regular_price",
    "final_price",
];

/// Sibling keys that carry the currency for a price in the same object.
const CURRENCY_KEYS: &[&str] = &["pricecurrency", "currency", "currency_code", "currencycode"];

pub struct JsonPriceStrategy;

impl Strategy<PriceFinding> for JsonPriceStrategy {
    fn name(&self) -> &'static str {
        "json-price-strategy"
    }

    fn extract(&self, ctx: &ExtractionContext<'_>) -> StrategyOutcome<PriceFinding> {
        if ctx.json_blobs.is_empty() {
            return StrategyOutcome::miss("no json blobs");
        }

        let mut candidates = Vec::new();
        for blob in ctx.json_blobs {
            walk(blob, 0, false, &mut candidates);
        }

        let count = candidates.len();
        match best_candidate(candidates) {
            Some(finding) => StrategyOutcome::hit(
                finding,
                format!("picked best of {count} candidate(s)"),
            ),
            None => StrategyOutcome::miss("no price-like keys in json"),
        }
    }
}

fn walk(value: &Value, depth: usize, in_offers: bool, out: &mut Vec<Candidate>) {
    if depth > MAX_DEPTH {
        return;
    }

    match value {
        Value::Object(map) => {
            let sibling_currency = map
                .iter()
                .find(|(k, _)| CURRENCY_KEYS.contains(&k.to_lowercase().as_str()))
                .and_then(|(_, v)| v.as_str())
                .map(str::to_uppercase);

            for (key, child) in map {
                let lower = key.to_lowercase();

                if is_price_key(&lower) {
                    if let Some((amount, raw)) = numeric(child) {
                        out.push(score(
                            amount,
                            raw,
                            sibling_currency.clone(),
                            &lower,
                            in_offers,
                        ));
                    }
                }

                let child_in_offers = in_offers || lower == "offers";
                walk(child, depth + 1, child_in_offers, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, depth + 1, in_offers, out);
            }
        }
        _ => {}
    }
}

fn is_price_key(lower: &str) -> bool {
    PRICE_KEYS.iter().any(|k| lower.contains(k))
}

/// Interpret a JSON value as a money amount. Strings go through the full
/// separator policy; numbers are taken at face value.
fn numeric(value: &Value) -> Option<(Decimal, String)> {
    match value {
        Value::String(s) => money::parse_amount(s).map(|amount| (amount, s.clone())),
        Value::Number(n) => {
            let raw = n.to_string();
            money::parse_amount(&raw).map(|amount| (amount, raw))
        }
        _ => None,
    }
}

fn score(
    amount: Decimal,
    raw: String,
    sibling_currency: Option<String>,
    key: &str,
    in_offers: bool,
) -> Candidate {
    let currency = sibling_currency
        .filter(|c| c.len() == 3 && c.chars().all(|ch| ch.is_ascii_alphabetic()))
        .or_else(|| money::detect_currency(&raw).map(str::to_string));

    let mut score = 0;
    if currency.is_some() {
        score += 10;
    }
    if amount >= Decimal::new(1, 2) && amount <= Decimal::new(100_000, 0) {
        score += 5;
    }
    if key.contains("current") || key.contains("sale") {
        score += 3;
    }
    if in_offers {
        score += 2;
    }

    Candidate {
        finding: PriceFinding {
            amount,
            currency,
            raw,
        },
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Dom;
    use serde_json::json;

    fn run(blobs: &[Value]) -> StrategyOutcome<PriceFinding> {
        let dom = Dom::parse("");
        let ctx = ExtractionContext {
            dom: &dom,
            json_blobs: blobs,
            html: "",
        };
        JsonPriceStrategy.extract(&ctx)
    }

    fn dec(s: &str) -> Decimal {
        s.parse().expect("decimal literal")
    }

    #[test]
    fn simple_price_key_is_found() {
        let blobs = vec![json!({"product": {"price": "29.99"}})];
        let finding = run(&blobs).result.expect("finding");
        assert_eq!(finding.amount, dec("29.99"));
    }

    #[test]
    fn sibling_currency_is_attached() {
        let blobs = vec![json!({"price": 49.5, "currency": "eur"})];
        let finding = run(&blobs).result.expect("finding");
        assert_eq!(finding.currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn offers_price_with_currency_beats_bare_number() {
        let blobs = vec![json!({
            "weight_value": 250,
            "offers": [{"price": "29.99", "priceCurrency": "USD"}]
        })];
        let finding = run(&blobs).result.expect("finding");
        assert_eq!(finding.amount, dec("29.99"));
        assert_eq!(finding.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn sale_price_outranks_regular_when_scores_tie_otherwise() {
        let blobs = vec![json!({
            "regular_price": "40.00",
            "sale_price": "35.00"
        })];
        let finding = run(&blobs).result.expect("finding");
        assert_eq!(finding.amount, dec("35.00"));
    }

    #[test]
    fn depth_limit_stops_runaway_nesting() {
        // 12 levels deep; the price is beyond the walk limit.
        let mut value = json!({"price": "10.00"});
        for _ in 0..12 {
            value = json!({"wrap": value});
        }
        let outcome = run(&[value]);
        assert!(outcome.result.is_none());
    }

    #[test]
    fn non_numeric_price_values_are_ignored() {
        let blobs = vec![json!({"price": "call for pricing"})];
        assert!(run(&blobs).result.is_none());
    }
}
