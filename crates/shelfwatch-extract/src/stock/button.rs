//! Stock recovery from purchase-button state.
//!
//! An enabled "Add to Cart" argues in-stock; a disabled one, or a button
//! reading "Sold Out", argues the opposite. Both sides accumulate score and
//! the stronger one wins.

use regex::Regex;
use shelfwatch_core::StockStatus;

use crate::dom::ElementRef;
use crate::strategy::{ExtractionContext, Strategy, StrategyOutcome};

use super::StockFinding;

pub struct ButtonStockStrategy;

impl Strategy<StockFinding> for ButtonStockStrategy {
    fn name(&self) -> &'static str {
        "button-stock-strategy"
    }

    fn extract(&self, ctx: &ExtractionContext<'_>) -> StrategyOutcome<StockFinding> {
        let buy_text = Regex::new(
            r"(?i)add to (?:cart|bag|basket)|buy now|purchase|checkout|shop now|order now",
        )
        .expect("valid buy regex");
        let oos_text = Regex::new(r"(?i)sold[- ]out|out of stock|unavailable|notify me")
            .expect("valid oos regex");
        let cartish = Regex::new(r"(?i)add|cart|bag|basket").expect("valid cartish regex");

        let mut in_score = 0;
        let mut out_score = 0;
        let mut in_raw: Option<String> = None;
        let mut out_raw: Option<String> = None;

        for element in ctx.dom.elements() {
            if !is_button(&element) {
                continue;
            }
            let label = label(&element);
            if label.is_empty() {
                continue;
            }
            let disabled = is_disabled(&element);

            if buy_text.is_match(&label) {
                in_score += 10;
                if disabled {
                    in_score -= 8;
                } else {
                    in_score += 5;
                }
                in_raw.get_or_insert_with(|| label.clone());
            }

            if oos_text.is_match(&label) {
                out_score += 10;
                if disabled {
                    out_score += 5;
                }
                out_raw.get_or_insert_with(|| label.clone());
            }

            // A dead purchase control is itself an out-of-stock signal even
            // when its label still reads "Add to Cart".
            if disabled && cartish.is_match(&label) {
                out_score += 12;
                out_raw.get_or_insert_with(|| label.clone());
            }
        }

        if in_score == 0 && out_score == 0 {
            return StrategyOutcome::miss("no purchase controls found");
        }

        let (status, raw, score) = if out_score > in_score {
            (StockStatus::OutOfStock, out_raw, out_score)
        } else {
            (StockStatus::InStock, in_raw, in_score)
        };

        StrategyOutcome::hit(
            StockFinding { status, raw },
            format!("in={in_score} out={out_score} → {status} ({score})"),
        )
    }
}

fn is_button(element: &ElementRef<'_>) -> bool {
    match element.tag() {
        "button" => true,
        "a" => element.class_contains("btn") || element.class_contains("button"),
        "input" => element
            .attr("type")
            .is_some_and(|t| matches!(t.to_lowercase().as_str(), "submit" | "button")),
        _ => false,
    }
}

fn label(element: &ElementRef<'_>) -> String {
    let text = element.text();
    if text.is_empty() {
        element.attr("value").unwrap_or_default()
    } else {
        text
    }
}

fn is_disabled(element: &ElementRef<'_>) -> bool {
    element.has_attr("disabled")
        || element
            .attr("aria-disabled")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
        || element
            .attr("data-disabled")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
        || element.class_contains("disabled")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Dom;

    fn run(html: &str) -> StrategyOutcome<StockFinding> {
        let dom = Dom::parse(html);
        let ctx = ExtractionContext {
            dom: &dom,
            json_blobs: &[],
            html,
        };
        ButtonStockStrategy.extract(&ctx)
    }

    #[test]
    fn enabled_add_to_cart_reads_in_stock() {
        let html = r#"<html><body><button class="cart">Add to Cart</button></body></html>"#;
        let finding = run(html).result.expect("finding");
        assert_eq!(finding.status, StockStatus::InStock);
        assert_eq!(finding.raw.as_deref(), Some("Add to Cart"));
    }

    #[test]
    fn disabled_add_to_cart_reads_out_of_stock() {
        let html = r#"<html><body><button disabled>Add to Cart</button></body></html>"#;
        let finding = run(html).result.expect("finding");
        assert_eq!(finding.status, StockStatus::OutOfStock);
    }

    #[test]
    fn sold_out_button_reads_out_of_stock() {
        let html =
            r#"<html><body><button class="btn disabled">Sold Out</button></body></html>"#;
        let finding = run(html).result.expect("finding");
        assert_eq!(finding.status, StockStatus::OutOfStock);
    }

    #[test]
    fn button_like_anchor_counts() {
        let html = r#"<html><body><a class="btn btn-primary" href="/cart/add">Buy Now</a></body></html>"#;
        let finding = run(html).result.expect("finding");
        assert_eq!(finding.status, StockStatus::InStock);
    }

    #[test]
    fn input_submit_value_counts() {
        let html = r#"<html><body><input type="submit" value="Add to Bag"></body></html>"#;
        let finding = run(html).result.expect("finding");
        assert_eq!(finding.status, StockStatus::InStock);
    }

    #[test]
    fn pages_without_buttons_defer() {
        assert!(run("<html><body><p>editorial page</p></body></html>").result.is_none());
    }
}
