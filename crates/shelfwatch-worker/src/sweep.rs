//! Sweep drivers: the periodic check sweep, the catch-up sweep for freshly
//! tracked products, and the retention sweep. Each sweep writes one
//! `scheduler_logs` row summarizing what it did.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use serde_json::json;
use sqlx::PgPool;

use shelfwatch_core::{AppConfig, CheckStatus};
use shelfwatch_db::{
    insert_scheduler_log, list_due_products, list_never_checked_products,
    prune_finished_check_runs, prune_history, NewSchedulerLog,
};
use shelfwatch_fetch::{Fetcher, PageRenderer};

use crate::checker::{check_product_with_lock, CheckOutcome};
use crate::state::WorkerState;

/// Counters for one sweep, recorded into `scheduler_logs`.
#[derive(Debug, Default)]
pub struct SweepStats {
    pub candidates: i32,
    pub checked: i32,
    pub skipped: i32,
    pub failed: i32,
    pub notifications: i32,
}

/// Run the periodic check sweep over due tracked products.
pub async fn run_check_sweep<R: PageRenderer>(
    pool: &PgPool,
    fetcher: &Fetcher<R>,
    config: &AppConfig,
    state: &Arc<WorkerState>,
) {
    // Over-fetch ×2 so lock contention with a sibling sweep still leaves a
    // full batch of checkable candidates.
    let candidates = match list_due_products(
        pool,
        config.min_check_interval_minutes,
        config.max_products_per_run * 2,
    )
    .await
    {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!(error = %e, "check sweep: failed to load due products");
            record_failed_sweep(pool, "check", &e.to_string()).await;
            return;
        }
    };

    drive_sweep(pool, fetcher, config, state, "check", candidates).await;
}

/// Run the catch-up sweep: tracked products that have never completed a
/// check get their first one without waiting out a full check interval.
pub async fn run_tracking_sweep<R: PageRenderer>(
    pool: &PgPool,
    fetcher: &Fetcher<R>,
    config: &AppConfig,
    state: &Arc<WorkerState>,
) {
    let candidates =
        match list_never_checked_products(pool, config.max_products_per_run * 2).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(error = %e, "tracking sweep: failed to load candidates");
                record_failed_sweep(pool, "tracking", &e.to_string()).await;
                return;
            }
        };

    if candidates.is_empty() {
        tracing::debug!("tracking sweep: nothing to catch up");
        return;
    }

    drive_sweep(pool, fetcher, config, state, "tracking", candidates).await;
}

/// Fan candidates out to bounded concurrent per-product checks and record
/// the sweep summary.
async fn drive_sweep<R: PageRenderer>(
    pool: &PgPool,
    fetcher: &Fetcher<R>,
    config: &AppConfig,
    state: &Arc<WorkerState>,
    sweep: &'static str,
    candidates: Vec<i64>,
) {
    let run_started_at = Utc::now();
    let candidate_count = i32::try_from(candidates.len()).unwrap_or(i32::MAX);
    let budget = config.max_products_per_run;

    let checked = AtomicI32::new(0);
    let skipped = AtomicI32::new(0);
    let failed = AtomicI32::new(0);
    let notifications = AtomicI32::new(0);

    futures::stream::iter(candidates)
        .for_each_concurrent(config.tracking_concurrency, |product_id| {
            let checked = &checked;
            let skipped = &skipped;
            let failed = &failed;
            let notifications = &notifications;
            async move {
                if state.is_shutting_down() {
                    return;
                }
                // The over-fetched tail is only consumed when earlier
                // candidates were lock-skipped.
                if i64::from(checked.load(Ordering::SeqCst)) >= budget {
                    return;
                }

                state.job_started(product_id);
                let outcome =
                    check_product_with_lock(pool, fetcher, config, product_id).await;
                state.job_finished(product_id);

                match outcome {
                    Ok(CheckOutcome::Checked(summary)) => {
                        checked.fetch_add(1, Ordering::SeqCst);
                        if summary.status == CheckStatus::Failed {
                            failed.fetch_add(1, Ordering::SeqCst);
                        }
                        notifications.fetch_add(
                            i32::try_from(summary.notification_count).unwrap_or(i32::MAX),
                            Ordering::SeqCst,
                        );
                    }
                    Ok(CheckOutcome::Skipped(reason)) => {
                        tracing::debug!(product_id, ?reason, "sweep skip");
                        skipped.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => {
                        tracing::error!(product_id, error = %e, "product check errored");
                        failed.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
        })
        .await;

    let stats = SweepStats {
        candidates: candidate_count,
        checked: checked.into_inner(),
        skipped: skipped.into_inner(),
        failed: failed.into_inner(),
        notifications: notifications.into_inner(),
    };

    tracing::info!(
        sweep,
        candidates = stats.candidates,
        checked = stats.checked,
        skipped = stats.skipped,
        failed = stats.failed,
        notifications = stats.notifications,
        "sweep complete"
    );

    let log = NewSchedulerLog {
        run_started_at,
        run_finished_at: Utc::now(),
        products_checked: stats.checked,
        items_checked: stats.notifications,
        success: stats.failed == 0,
        error: None,
        metadata: json!({
            "sweep": sweep,
            "candidates": stats.candidates,
            "skipped": stats.skipped,
            "failed": stats.failed,
        }),
    };
    if let Err(e) = insert_scheduler_log(pool, &log).await {
        tracing::error!(error = %e, "failed to record scheduler log");
    }
}

/// Retention sweep: prune history rows and finished check runs beyond the
/// retention window.
pub async fn run_retention_sweep(pool: &PgPool, config: &AppConfig) {
    let run_started_at = Utc::now();

    let history_removed = match prune_history(pool, config.retention_days).await {
        Ok(n) => n,
        Err(e) => {
            tracing::error!(error = %e, "retention sweep: history prune failed");
            record_failed_sweep(pool, "retention", &e.to_string()).await;
            return;
        }
    };
    let runs_removed = match prune_finished_check_runs(pool, config.retention_days).await {
        Ok(n) => n,
        Err(e) => {
            tracing::error!(error = %e, "retention sweep: check-run prune failed");
            record_failed_sweep(pool, "retention", &e.to_string()).await;
            return;
        }
    };

    tracing::info!(history_removed, runs_removed, "retention sweep complete");

    let log = NewSchedulerLog {
        run_started_at,
        run_finished_at: Utc::now(),
        products_checked: 0,
        items_checked: 0,
        success: true,
        error: None,
        metadata: json!({
            "sweep": "retention",
            "history_removed": history_removed,
            "check_runs_removed": runs_removed,
        }),
    };
    if let Err(e) = insert_scheduler_log(pool, &log).await {
        tracing::error!(error = %e, "failed to record scheduler log");
    }
}

async fn record_failed_sweep(pool: &PgPool, sweep: &'static str, error: &str) {
    let now = Utc::now();
    let log = NewSchedulerLog {
        run_started_at: now,
        run_finished_at: now,
        products_checked: 0,
        items_checked: 0,
        success: false,
        error: Some(error.to_string()),
        metadata: json!({"sweep": sweep}),
    };
    if let Err(e) = insert_scheduler_log(pool, &log).await {
        tracing::error!(error = %e, "failed to record failed-sweep log");
    }
}
