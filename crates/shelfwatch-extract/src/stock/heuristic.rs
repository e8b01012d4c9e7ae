//! Last-resort stock recovery: pattern-match the raw document text.

use crate::patterns::stock_like_strings;
use crate::strategy::{ExtractionContext, Strategy, StrategyOutcome};

use super::{status_from_text, StockFinding};

pub struct HeuristicStockStrategy;

impl Strategy<StockFinding> for HeuristicStockStrategy {
    fn name(&self) -> &'static str {
        "heuristic-stock-strategy"
    }

    fn extract(&self, ctx: &ExtractionContext<'_>) -> StrategyOutcome<StockFinding> {
        let phrases = stock_like_strings(ctx.html);
        let count = phrases.len();

        for phrase in phrases {
            if let Some(status) = status_from_text(&phrase) {
                return StrategyOutcome::hit(
                    StockFinding {
                        status,
                        raw: Some(phrase),
                    },
                    format!("matched 1 of {count} phrase(s)"),
                );
            }
        }

        StrategyOutcome::miss("no stock-like strings in document")
    }
}
