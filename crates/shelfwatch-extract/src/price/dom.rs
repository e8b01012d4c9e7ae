//! Price recovery from price-ish DOM elements, meta tags, and body text.

use crate::money;
use crate::patterns::price_like_strings;
use crate::strategy::{ExtractionContext, Strategy, StrategyOutcome};
use crate::text::strip_tags;

use super::{best_candidate, Candidate, PriceFinding};

/// Words near an element that back up a price reading.
const CONTEXT_WORDS: &[&str] = &["price", "sale", "now", "deal", "total", "buy"];

pub struct DomPriceStrategy;

impl Strategy<PriceFinding> for DomPriceStrategy {
    fn name(&self) -> &'static str {
        "dom-price-strategy"
    }

    fn extract(&self, ctx: &ExtractionContext<'_>) -> StrategyOutcome<PriceFinding> {
        let mut candidates = Vec::new();

        // Meta tags are the strongest DOM evidence there is.
        if let Some(content) = ctx.dom.meta_content("product:price:amount") {
            if let Some(amount) = money::parse_amount(&content) {
                let currency = ctx
                    .dom
                    .meta_content("product:price:currency")
                    .map(|c| c.to_uppercase())
                    .or_else(|| money::detect_currency(&content).map(str::to_string));
                candidates.push(Candidate {
                    finding: PriceFinding {
                        amount,
                        currency,
                        raw: content,
                    },
                    score: 22,
                });
            }
        }

        // Elements whose class or id mentions "price", plus [data-price].
        for element in ctx.dom.elements() {
            let signal = element.class_contains("price") || element.id_contains("price");
            let data_price = element.attr("data-price");
            if !signal && data_price.is_none() {
                continue;
            }

            if let Some(raw) = data_price {
                if let Some(amount) = money::parse_amount(&raw) {
                    candidates.push(scored(&element, amount, raw, 8));
                }
            }

            let element_text = element.text();
            for raw in price_like_strings(&element_text) {
                if let Some(amount) = money::parse_amount(&raw) {
                    let base = if signal { 8 } else { 4 };
                    candidates.push(scored(&element, amount, raw, base));
                }
            }
        }

        // Whole-body text sweep, weakest signal.
        let body_text = strip_tags(ctx.dom.html());
        for raw in price_like_strings(&body_text) {
            if let Some(amount) = money::parse_amount(&raw) {
                let mut score = 1;
                if money::detect_currency(&raw).is_some() {
                    score += 4;
                }
                candidates.push(Candidate {
                    finding: PriceFinding {
                        amount,
                        currency: money::detect_currency(&raw).map(str::to_string),
                        raw,
                    },
                    score,
                });
            }
        }

        let count = candidates.len();
        match best_candidate(candidates) {
            Some(finding) => {
                StrategyOutcome::hit(finding, format!("picked best of {count} candidate(s)"))
            }
            None => StrategyOutcome::miss("no price-like dom evidence"),
        }
    }
}

fn scored(
    element: &crate::dom::ElementRef<'_>,
    amount: rust_decimal::Decimal,
    raw: String,
    base: i32,
) -> Candidate {
    let mut score = base;

    if element.class_contains("current") || element.class_contains("sale") {
        score += 3;
    }
    if money::detect_currency(&raw).is_some() {
        score += 4;
    }
    if amount >= rust_decimal::Decimal::new(1, 2) && amount <= rust_decimal::Decimal::new(100_000, 0)
    {
        score += 5;
    }
    let window = element.context_window(120).to_lowercase();
    if CONTEXT_WORDS.iter().any(|w| window.contains(w)) {
        score += 2;
    }

    Candidate {
        finding: PriceFinding {
            amount,
            currency: money::detect_currency(&raw).map(str::to_string),
            raw,
        },
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Dom;
    use rust_decimal::Decimal;

    fn run(html: &str) -> StrategyOutcome<PriceFinding> {
        let dom = Dom::parse(html);
        let ctx = ExtractionContext {
            dom: &dom,
            json_blobs: &[],
            html,
        };
        DomPriceStrategy.extract(&ctx)
    }

    #[test]
    fn price_class_element_wins_over_body_text() {
        let html = r#"<html><body>
            <span>shipping from 4.99</span>
            <div class="product-price sale-price">$29.99</div>
        </body></html>"#;
        let finding = run(html).result.expect("finding");
        assert_eq!(finding.amount, Decimal::new(2999, 2));
        assert_eq!(finding.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn meta_price_tags_are_strongest() {
        let html = r#"<html><head>
            <meta property="product:price:amount" content="42.00">
            <meta property="product:price:currency" content="gbp">
        </head><body><div class="price">$9.99</div></body></html>"#;
        let finding = run(html).result.expect("finding");
        assert_eq!(finding.amount, Decimal::new(4200, 2));
        assert_eq!(finding.currency.as_deref(), Some("GBP"));
    }

    #[test]
    fn data_price_attribute_is_read_directly() {
        let html = r#"<html><body><div data-price="19.95">special</div></body></html>"#;
        let finding = run(html).result.expect("finding");
        assert_eq!(finding.amount, Decimal::new(1995, 2));
    }

    #[test]
    fn no_prices_anywhere_is_a_miss() {
        let outcome = run("<html><body><p>nothing numeric here</p></body></html>");
        assert!(outcome.result.is_none());
    }
}
