//! One product check: advisory lock, throttle double-check, check-run
//! bookkeeping, and the fetch → extract → ingest pipeline.

use std::time::Instant;

use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;

use shelfwatch_core::{AppConfig, CheckStatus, ProductSnapshot};
use shelfwatch_db::{
    create_check_run, finish_check_run, get_product, ingest_snapshot, last_finished_at,
    with_product_lock,
};
use shelfwatch_fetch::{Fetcher, PageRenderer};

/// Why a product was passed over this sweep. Not an error: the sweep
/// summary counts skips separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another worker holds the per-product lock.
    Locked,
    /// A finished run inside the throttle window already covers it.
    Throttled,
}

/// What one completed check did.
#[derive(Debug)]
pub struct CheckSummary {
    pub check_run_id: i64,
    pub status: CheckStatus,
    pub variant_count: usize,
    pub notification_count: usize,
    pub duration_ms: u64,
}

#[derive(Debug)]
pub enum CheckOutcome {
    Checked(CheckSummary),
    Skipped(SkipReason),
}

/// Check one product under its advisory lock.
///
/// Lock contention and throttle hits surface as [`CheckOutcome::Skipped`];
/// a failed fetch is a completed check with `status = failed`. Only
/// database-level failures return `Err`, after the check run (when one
/// exists) was marked failed.
///
/// # Errors
///
/// Returns any error from the database layer; ingestion failures re-raise
/// after finalizing the check run.
pub async fn check_product_with_lock<R: PageRenderer>(
    pool: &PgPool,
    fetcher: &Fetcher<R>,
    config: &AppConfig,
    product_id: i64,
) -> anyhow::Result<CheckOutcome> {
    let outcome = with_product_lock::<CheckOutcome, anyhow::Error, _, _>(pool, product_id, || async {
        // Re-check the throttle anchor now that we hold the lock: another
        // sweep may have finished a check between candidate selection and
        // lock acquisition.
        if let Some(last) = last_finished_at(pool, product_id).await? {
            let window = Duration::minutes(i64::from(config.min_check_interval_minutes));
            if Utc::now() - last < window {
                tracing::debug!(product_id, "inside throttle window; skipping");
                return Ok(CheckOutcome::Skipped(SkipReason::Throttled));
            }
        }

        let summary = run_check(pool, fetcher, config, product_id).await?;
        Ok(CheckOutcome::Checked(summary))
    })
    .await?;

    Ok(outcome.unwrap_or(CheckOutcome::Skipped(SkipReason::Locked)))
}

/// The fetch → extract → ingest pipeline for one product, with check-run
/// bookkeeping on every path.
async fn run_check<R: PageRenderer>(
    pool: &PgPool,
    fetcher: &Fetcher<R>,
    config: &AppConfig,
    product_id: i64,
) -> anyhow::Result<CheckSummary> {
    let product = get_product(pool, product_id).await?;
    let run = create_check_run(pool, product_id).await?;
    let started = Instant::now();

    tracing::info!(product_id, check_run_id = run.id, url = %product.url, "checking product");

    let fetch_result = fetcher.fetch(&product.url).await;

    if !fetch_result.success {
        let error = fetch_result
            .error
            .clone()
            .unwrap_or_else(|| "fetch failed".to_string());
        let metadata = json!({
            "mode": fetch_result.mode.as_str(),
            "duration_ms": elapsed_ms(started),
        });
        finish_check_run(pool, run.id, CheckStatus::Failed, Some(&error), &metadata).await?;
        tracing::warn!(product_id, check_run_id = run.id, error = %error, "fetch failed");
        return Ok(CheckSummary {
            check_run_id: run.id,
            status: CheckStatus::Failed,
            variant_count: 0,
            notification_count: 0,
            duration_ms: elapsed_ms(started),
        });
    }

    let snapshot = shelfwatch_extract::extract(&fetch_result);

    match ingest_snapshot(pool, &snapshot, config.check_lock_timeout_seconds).await {
        Ok(ingested) => {
            let status = completed_status(&snapshot);
            let metadata = json!({
                "mode": fetch_result.mode.as_str(),
                "variant_count": ingested.variants.len(),
                "new_variants": ingested.new_variants,
                "price_changes": ingested.price_changes,
                "stock_changes": ingested.stock_changes,
                "notifications": ingested.notifications.len(),
                "notes": snapshot.notes,
                "is_likely_dynamic": snapshot.metadata.is_likely_dynamic,
                "duration_ms": elapsed_ms(started),
            });
            finish_check_run(pool, run.id, status, None, &metadata).await?;

            Ok(CheckSummary {
                check_run_id: run.id,
                status,
                variant_count: ingested.variants.len(),
                notification_count: ingested.notifications.len(),
                duration_ms: elapsed_ms(started),
            })
        }
        Err(e) => {
            // Mark the run failed, then re-raise the original error.
            let metadata = json!({
                "mode": fetch_result.mode.as_str(),
                "duration_ms": elapsed_ms(started),
            });
            if let Err(mark_err) = finish_check_run(
                pool,
                run.id,
                CheckStatus::Failed,
                Some(&e.to_string()),
                &metadata,
            )
            .await
            {
                tracing::error!(
                    check_run_id = run.id,
                    error = %mark_err,
                    "failed to record check failure"
                );
            }
            Err(e.into())
        }
    }
}

/// `partial` when ingestion succeeded but extraction recovered no pricing
/// and no stock signal anywhere; `success` otherwise.
fn completed_status(snapshot: &ProductSnapshot) -> CheckStatus {
    let any_price = snapshot.pricing.is_some()
        || snapshot.variants.iter().any(|v| v.price.is_some());
    let any_stock = snapshot.stock.is_some()
        || snapshot.variants.iter().any(|v| v.stock_status.is_some());

    if any_price || any_stock {
        CheckStatus::Success
    } else {
        CheckStatus::Partial
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use shelfwatch_core::{PriceShell, StockShell, StockStatus};

    fn empty_snapshot() -> ProductSnapshot {
        ProductSnapshot::empty("https://shop.example/p", Utc::now())
    }

    #[test]
    fn no_signals_is_partial() {
        assert_eq!(completed_status(&empty_snapshot()), CheckStatus::Partial);
    }

    #[test]
    fn product_level_price_is_success() {
        let mut snapshot = empty_snapshot();
        snapshot.pricing = Some(PriceShell {
            amount: Decimal::new(999, 2),
            currency: None,
            raw: "9.99".to_string(),
            strategy: "json-price-strategy".to_string(),
        });
        assert_eq!(completed_status(&snapshot), CheckStatus::Success);
    }

    #[test]
    fn product_level_stock_is_success() {
        let mut snapshot = empty_snapshot();
        snapshot.stock = Some(StockShell {
            status: StockStatus::InStock,
            raw: None,
            strategy: "dom-stock-strategy".to_string(),
        });
        assert_eq!(completed_status(&snapshot), CheckStatus::Success);
    }
}
