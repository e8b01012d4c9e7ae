//! Stock recovery from element text and `data-*` inventory attributes.

use regex::Regex;
use shelfwatch_core::StockStatus;

use crate::strategy::{ExtractionContext, Strategy, StrategyOutcome};

use super::{status_from_text, StockFinding};

/// Elements with more text than this are containers, not status badges.
const MAX_BADGE_TEXT: usize = 120;

/// Winner tie-break: the rarer, more deliberate signals first.
const PRIORITY: &[StockStatus] = &[
    StockStatus::OutOfStock,
    StockStatus::LowStock,
    StockStatus::Backorder,
    StockStatus::Preorder,
    StockStatus::InStock,
];

pub struct DomStockStrategy;

impl Strategy<StockFinding> for DomStockStrategy {
    fn name(&self) -> &'static str {
        "dom-stock-strategy"
    }

    fn extract(&self, ctx: &ExtractionContext<'_>) -> StrategyOutcome<StockFinding> {
        let families: [(StockStatus, Regex); 5] = [
            (
                StockStatus::OutOfStock,
                Regex::new(r"(?i)\b(?:sold[- ]out|out[- ]of[- ]stock|currently unavailable|no longer available)\b")
                    .expect("valid out-of-stock regex"),
            ),
            (
                StockStatus::LowStock,
                Regex::new(r"(?i)\b(?:only \d+ left|\d+ left in stock|low stock|limited stock|few left)\b")
                    .expect("valid low-stock regex"),
            ),
            (
                StockStatus::Backorder,
                Regex::new(r"(?i)\bback[- ]?order(?:ed)?\b").expect("valid backorder regex"),
            ),
            (
                StockStatus::Preorder,
                Regex::new(r"(?i)\b(?:pre[- ]?order|coming soon)\b").expect("valid preorder regex"),
            ),
            (
                StockStatus::InStock,
                Regex::new(r"(?i)\b(?:in[- ]stock|available now|ready to ship|ships today)\b")
                    .expect("valid in-stock regex"),
            ),
        ];

        let mut totals: Vec<(StockStatus, i32, String)> = Vec::new();
        let mut bump = |status: StockStatus, points: i32, raw: &str| {
            // Unknown is a non-answer; scoring it would only shadow real
            // signals in the tie-break.
            if status == StockStatus::Unknown {
                return;
            }
            if let Some(entry) = totals.iter_mut().find(|(s, _, _)| *s == status) {
                entry.1 += points;
            } else {
                totals.push((status, points, raw.to_string()));
            }
        };

        for element in ctx.dom.elements() {
            let stockish_name = ["stock", "availability", "inventory"]
                .iter()
                .any(|n| element.class_contains(n) || element.id_contains(n));

            // data-stock / data-availability / data-inventory attributes.
            for attr in ["data-stock", "data-availability", "data-inventory"] {
                if let Some(value) = element.attr(attr) {
                    if let Some(status) = status_from_text(&value) {
                        bump(status, 8, &value);
                    }
                }
            }

            let text = element.text();
            if text.is_empty() || text.len() > MAX_BADGE_TEXT {
                continue;
            }
            for (status, re) in &families {
                if let Some(m) = re.find(&text) {
                    let points = if stockish_name { 10 } else { 5 };
                    bump(*status, points, m.as_str());
                }
            }
        }

        if totals.is_empty() {
            return StrategyOutcome::miss("no stock-like dom evidence");
        }

        let max_score = totals.iter().map(|(_, s, _)| *s).max().unwrap_or(0);
        let winner = PRIORITY
            .iter()
            .find_map(|p| {
                totals
                    .iter()
                    .find(|(status, score, _)| status == p && *score == max_score)
            })
            .expect("non-empty totals have a winner");

        StrategyOutcome::hit(
            StockFinding {
                status: winner.0,
                raw: Some(winner.2.clone()),
            },
            format!("{} scored {}", winner.0, winner.1),
        )
    }
}
