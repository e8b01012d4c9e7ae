//! Last-resort price recovery: pattern-match the raw document text.

use rust_decimal::Decimal;

use crate::money;
use crate::patterns::price_like_strings;
use crate::strategy::{ExtractionContext, Strategy, StrategyOutcome};

use super::{best_candidate, Candidate, PriceFinding};

pub struct HeuristicPriceStrategy;

impl Strategy<PriceFinding> for HeuristicPriceStrategy {
    fn name(&self) -> &'static str {
        "heuristic-price-strategy"
    }

    fn extract(&self, ctx: &ExtractionContext<'_>) -> StrategyOutcome<PriceFinding> {
        let floor = Decimal::new(1, 1); // 0.1
        let ceiling = Decimal::new(10_000, 0);

        let mut candidates = Vec::new();
        for raw in price_like_strings(ctx.html) {
            let Some(amount) = money::parse_amount(&raw) else {
                continue;
            };
            if amount < floor || amount > ceiling {
                continue;
            }

            let mut score = 0;
            if money::detect_currency(&raw).is_some() {
                score += 4;
            }
            if raw.contains('.') {
                score += 2;
            }
            if raw.len() <= 8 {
                score += 1;
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

        let count = candidates.len();
        match best_candidate(candidates) {
            Some(finding) => {
                StrategyOutcome::hit(finding, format!("picked best of {count} candidate(s)"))
            }
            None => StrategyOutcome::miss("no price-like strings in document"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Dom;

    fn run(html: &str) -> StrategyOutcome<PriceFinding> {
        let dom = Dom::parse(html);
        let ctx = ExtractionContext {
            dom: &dom,
            json_blobs: &[],
            html,
        };
        HeuristicPriceStrategy.extract(&ctx)
    }

    #[test]
    fn currency_marked_decimal_wins() {
        let outcome = run("lorem 1280 ipsum $24.99 dolor 500");
        let finding = outcome.result.expect("finding");
        assert_eq!(finding.amount, Decimal::new(2499, 2));
        assert_eq!(finding.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn band_filter_drops_extremes() {
        let outcome = run("population 45000 area 99999");
        assert!(outcome.result.is_none());
    }

    #[test]
    fn plain_text_is_a_miss() {
        assert!(run("no numbers to speak of").result.is_none());
    }
}
