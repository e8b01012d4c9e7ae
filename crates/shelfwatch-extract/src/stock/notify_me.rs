//! The notify-me detector.
//!
//! Fashion and luxury storefronts often mark an item unavailable by removing
//! the purchase control and offering a restock alert instead, while their
//! structured data still claims `InStock`. This strategy scores those
//! signals and, above threshold, overrides everything downstream; it runs
//! first in the cascade precisely so its decision is final.

use regex::Regex;
use shelfwatch_core::StockStatus;

use crate::dom::ElementRef;
use crate::strategy::{ExtractionContext, Strategy, StrategyOutcome};
use crate::text::strip_tags;

use super::StockFinding;

const SCORE_NOTIFY_CONTROL: i32 = 30;
const SCORE_NOTIFY_FORM: i32 = 28;
const SCORE_EMAIL_IN_CONTEXT: i32 = 25;
const SCORE_FUTURE_COPY: i32 = 20;
const ACTIVE_CTA_PENALTY: i32 = 20;

const THRESHOLD: i32 = 20;
const THRESHOLD_WITH_ACTIVE_CTA: i32 = 40;

pub struct NotifyMeStockStrategy;

impl Strategy<StockFinding> for NotifyMeStockStrategy {
    fn name(&self) -> &'static str {
        "notify-me-stock-strategy"
    }

    fn extract(&self, ctx: &ExtractionContext<'_>) -> StrategyOutcome<StockFinding> {
        let notify_text = Regex::new(
            r"(?i)notify me|get notified|email (?:me )?when (?:it'?s )?(?:back|available)|wait ?list|remind me|back[- ]in[- ]stock alert|notify when available",
        )
        .expect("valid notify-control regex");
        let future_copy = Regex::new(
            r"(?i)(?:currently|temporarily) (?:out of stock|unavailable)|back in stock soon|we'?ll (?:email|notify) you when|sold out",
        )
        .expect("valid future-copy regex");
        let cta_text = Regex::new(
            r"(?i)add to (?:cart|bag|basket)|buy now|purchase|checkout|shop now|order now",
        )
        .expect("valid cta regex");

        let mut score = 0;
        let mut evidence: Option<String> = None;
        let mut notes = Vec::new();

        // (a) Buttons/links/inputs that read like restock-alert controls.
        for element in ctx.dom.elements() {
            if !is_control(&element) {
                continue;
            }
            let label = control_label(&element);
            if notify_text.is_match(&label) {
                score += SCORE_NOTIFY_CONTROL;
                evidence.get_or_insert_with(|| label.clone());
                notes.push(format!("notify control: {label:?}"));
            }
        }

        // (d) Forms wired to notify/waitlist endpoints.
        for form in ctx.dom.by_tag("form") {
            let mut hints = String::new();
            for attr in ["action", "class", "id"] {
                if let Some(v) = form.attr(attr) {
                    hints.push_str(&v.to_lowercase());
                    hints.push(' ');
                }
            }
            if ["notify", "waitlist", "wait-list", "back-in-stock", "restock"]
                .iter()
                .any(|needle| hints.contains(needle))
            {
                score += SCORE_NOTIFY_FORM;
                notes.push(format!("notify form: {}", hints.trim()));
            }
        }

        // (b) Email capture sitting in notification context.
        for input in ctx.dom.by_tag("input") {
            let is_email = input
                .attr("type")
                .is_some_and(|t| t.eq_ignore_ascii_case("email"));
            if !is_email {
                continue;
            }
            let window = input.context_window(150).to_lowercase();
            if ["notify", "back in stock", "restock", "when available", "when it's back"]
                .iter()
                .any(|needle| window.contains(needle))
            {
                score += SCORE_EMAIL_IN_CONTEXT;
                notes.push("email input in notify context".to_string());
            }
        }

        // (c) Explicit future-availability copy anywhere in the body.
        let body_text = strip_tags(ctx.dom.html());
        if let Some(m) = future_copy.find(&body_text) {
            score += SCORE_FUTURE_COPY;
            evidence.get_or_insert_with(|| m.as_str().to_string());
            notes.push(format!("future-availability copy: {:?}", m.as_str()));
        }

        // An active purchase CTA argues the item is buyable after all.
        let active_cta = ctx.dom.elements().any(|element| {
            is_control(&element)
                && cta_text.is_match(&control_label(&element))
                && is_active(&element)
        });

        let threshold = if active_cta {
            score -= ACTIVE_CTA_PENALTY;
            notes.push("active purchase CTA present".to_string());
            THRESHOLD_WITH_ACTIVE_CTA
        } else {
            THRESHOLD
        };

        if score >= threshold {
            notes.push(format!("score {score} >= threshold {threshold}"));
            StrategyOutcome {
                result: Some(StockFinding {
                    status: StockStatus::OutOfStock,
                    raw: evidence,
                }),
                notes,
            }
        } else {
            notes.push(format!("score {score} below threshold {threshold}; deferring"));
            StrategyOutcome {
                result: None,
                notes,
            }
        }
    }
}

/// Button-like elements: buttons, links, and button/submit inputs.
fn is_control(element: &ElementRef<'_>) -> bool {
    match element.tag() {
        "button" | "a" => true,
        "input" => element
            .attr("type")
            .is_some_and(|t| matches!(t.to_lowercase().as_str(), "submit" | "button")),
        _ => false,
    }
}

/// The user-visible label of a control: inner text, or `value` for inputs.
fn control_label(element: &ElementRef<'_>) -> String {
    let text = element.text();
    if text.is_empty() {
        element.attr("value").unwrap_or_default()
    } else {
        text
    }
}

/// Enabled for purchase: no disabled attribute, no aria/data disabling, no
/// `disabled` class.
fn is_active(element: &ElementRef<'_>) -> bool {
    if element.has_attr("disabled") {
        return false;
    }
    if element
        .attr("aria-disabled")
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    {
        return false;
    }
    if element
        .attr("data-disabled")
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    {
        return false;
    }
    !element.class_contains("disabled")
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
        NotifyMeStockStrategy.extract(&ctx)
    }

    #[test]
    fn notify_button_alone_crosses_threshold() {
        let html = r#"<html><body>
            <button class="restock">Notify me when available</button>
        </body></html>"#;
        let finding = run(html).result.expect("finding");
        assert_eq!(finding.status, StockStatus::OutOfStock);
        assert_eq!(finding.raw.as_deref(), Some("Notify me when available"));
    }

    #[test]
    fn copy_alone_crosses_the_lower_threshold() {
        let html = r#"<html><body>
            <p>This colourway is temporarily out of stock. We'll email you when it returns.</p>
        </body></html>"#;
        let finding = run(html).result.expect("finding");
        assert_eq!(finding.status, StockStatus::OutOfStock);
    }

    #[test]
    fn active_add_to_cart_raises_the_bar() {
        // Copy hints at restocking (20), but an enabled Add to Cart both
        // subtracts 20 and raises the threshold to 40: no decision.
        let html = r#"<html><body>
            <p>Some sizes sold out — more coming soon.</p>
            <button class="add-to-cart">Add to Cart</button>
        </body></html>"#;
        assert!(run(html).result.is_none());
    }

    #[test]
    fn disabled_add_to_cart_does_not_raise_the_bar() {
        let html = r#"<html><body>
            <button disabled>Add to Cart</button>
            <form action="/back-in-stock" id="waitlist-form">
                <input type="email" placeholder="you@example.com"> Notify me
            </form>
        </body></html>"#;
        let finding = run(html).result.expect("finding");
        assert_eq!(finding.status, StockStatus::OutOfStock);
    }

    #[test]
    fn stacked_notify_signals_beat_an_active_cta() {
        // button 30 + form 28 + email 25 = 83, minus CTA penalty 20 = 63,
        // above the raised threshold of 40.
        let html = r#"<html><body>
            <button class="notify">Get notified</button>
            <form action="/notify" class="notify-form">
                <input type="email"> We'll email you when it's back in stock.
            </form>
            <button class="buy">Buy Now</button>
        </body></html>"#;
        let finding = run(html).result.expect("finding");
        assert_eq!(finding.status, StockStatus::OutOfStock);
    }

    #[test]
    fn plain_buyable_page_defers() {
        let html = r#"<html><body>
            <h1>Nice Tee</h1>
            <button class="add-to-cart">Add to Cart</button>
        </body></html>"#;
        assert!(run(html).result.is_none());
    }
}
