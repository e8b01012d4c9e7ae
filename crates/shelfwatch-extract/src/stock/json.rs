//! Stock recovery from embedded JSON blobs.

use serde_json::Value;
use shelfwatch_core::StockStatus;

use crate::strategy::{ExtractionContext, Strategy, StrategyOutcome};

use super::{status_from_text, StockFinding};

const MAX_DEPTH: usize = 10;

/// Stock-ish keys in descending specificity; the score is the rank weight.
const STOCK_KEYS: &[(&str, i32)] = &[
    ("availability", 10),
    ("availabilitystatus", 10),
    ("stock_status", 9),
    ("stockstatus", 9),
    ("in_stock", 8),
    ("instock", 8),
    ("available", 7),
    ("inventory_quantity", 6),
    ("inventoryquantity", 6),
    ("quantity", 5),
    ("qty", 5),
    ("stock", 5),
    ("inventory", 4),
];

struct Candidate {
    finding: StockFinding,
    score: i32,
}

pub struct JsonStockStrategy;

impl Strategy<StockFinding> for JsonStockStrategy {
    fn name(&self) -> &'static str {
        "json-stock-strategy"
    }

    fn extract(&self, ctx: &ExtractionContext<'_>) -> StrategyOutcome<StockFinding> {
        if ctx.json_blobs.is_empty() {
            return StrategyOutcome::miss("no json blobs");
        }

        let mut candidates = Vec::new();
        for blob in ctx.json_blobs {
            walk(blob, 0, &mut candidates);
        }

        let count = candidates.len();
        let best = candidates.into_iter().max_by_key(|c| c.score);
        match best {
            Some(candidate) => StrategyOutcome::hit(
                candidate.finding,
                format!("picked best of {count} candidate(s)"),
            ),
            None => StrategyOutcome::miss("no stock-like keys in json"),
        }
    }
}

fn walk(value: &Value, depth: usize, out: &mut Vec<Candidate>) {
    if depth > MAX_DEPTH {
        return;
    }

    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let lower = key.to_lowercase();
                if let Some((_, weight)) =
                    STOCK_KEYS.iter().find(|(k, _)| lower.as_str() == *k)
                {
                    if let Some(finding) = interpret(child) {
                        out.push(Candidate {
                            finding,
                            score: *weight,
                        });
                    }
                }
                walk(child, depth + 1, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, depth + 1, out);
            }
        }
        _ => {}
    }
}

/// Map a JSON value to a stock status: IRIs and phrases for strings,
/// true/false for booleans, and quantity bands for numbers (0 → out,
/// 1–4 → low, 5+ → in).
fn interpret(value: &Value) -> Option<StockFinding> {
    match value {
        Value::String(s) => status_from_text(s).map(|status| StockFinding {
            status,
            raw: Some(s.clone()),
        }),
        Value::Bool(b) => Some(StockFinding {
            status: if *b {
                StockStatus::InStock
            } else {
                StockStatus::OutOfStock
            },
            raw: Some(b.to_string()),
        }),
        Value::Number(n) => {
            let quantity = n.as_f64()?;
            if quantity < 0.0 {
                return None;
            }
            let status = if quantity == 0.0 {
                StockStatus::OutOfStock
            } else if quantity < 5.0 {
                StockStatus::LowStock
            } else {
                StockStatus::InStock
            };
            Some(StockFinding {
                status,
                raw: Some(n.to_string()),
            })
        }
        _ => None,
    }
}
