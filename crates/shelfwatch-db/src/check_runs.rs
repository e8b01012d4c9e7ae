//! Database operations for `check_runs` and the due-product queries that
//! drive the scheduler.
//!
//! A run's `status` stays `NULL` while in flight and is finalized exactly
//! once; the latest `finished_at` per product is the throttle anchor.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use shelfwatch_core::CheckStatus;

use crate::DbError;

const CHECK_RUN_COLUMNS: &str =
    "id, public_id, product_id, started_at, finished_at, status, error_message, metadata";

/// A row from the `check_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CheckRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub product_id: i64,
    pub started_at: DateTime<Utc>,
    /// `NULL` while the check is in flight.
    pub finished_at: Option<DateTime<Utc>>,
    /// `NULL` while in flight; `success` / `failed` / `partial` once done.
    pub status: Option<String>,
    pub error_message: Option<String>,
    pub metadata: serde_json::Value,
}

/// Open a check run for a product.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_check_run(pool: &PgPool, product_id: i64) -> Result<CheckRunRow, DbError> {
    let row = sqlx::query_as::<_, CheckRunRow>(&format!(
        "INSERT INTO check_runs (public_id, product_id) \
         VALUES ($1, $2) \
         RETURNING {CHECK_RUN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(product_id)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Finalize a run. Guarded so a run can only be finalized once.
///
/// # Errors
///
/// Returns [`DbError::CheckRunAlreadyFinalized`] when the row was already
/// closed, [`DbError::Sqlx`] on query failure.
pub async fn finish_check_run(
    pool: &PgPool,
    id: i64,
    status: CheckStatus,
    error_message: Option<&str>,
    metadata: &serde_json::Value,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE check_runs \
         SET status = $2, error_message = $3, metadata = metadata || $4::jsonb, \
             finished_at = NOW() \
         WHERE id = $1 AND status IS NULL",
    )
    .bind(id)
    .bind(status.as_str())
    .bind(error_message)
    .bind(metadata)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::CheckRunAlreadyFinalized { id });
    }

    Ok(())
}

/// The throttle anchor: when the product's latest run finished.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn last_finished_at(
    pool: &PgPool,
    product_id: i64,
) -> Result<Option<DateTime<Utc>>, DbError> {
    let finished: Option<DateTime<Utc>> = sqlx::query_scalar(
        "SELECT MAX(finished_at) FROM check_runs \
         WHERE product_id = $1 AND finished_at IS NOT NULL",
    )
    .bind(product_id)
    .fetch_one(pool)
    .await?;

    Ok(finished)
}

/// Tracked products whose latest finished run is older than the throttle
/// window, oldest-checked first. Never-checked products sort first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_due_products(
    pool: &PgPool,
    min_interval_minutes: u32,
    limit: i64,
) -> Result<Vec<i64>, DbError> {
    let ids: Vec<i64> = sqlx::query_scalar(
        "SELECT p.id \
         FROM products p \
         LEFT JOIN LATERAL ( \
             SELECT MAX(cr.finished_at) AS finished_at \
             FROM check_runs cr \
             WHERE cr.product_id = p.id AND cr.finished_at IS NOT NULL \
         ) last ON TRUE \
         WHERE EXISTS (SELECT 1 FROM tracked_items ti WHERE ti.product_id = p.id) \
           AND (last.finished_at IS NULL \
                OR last.finished_at < NOW() - make_interval(mins => $1)) \
         ORDER BY last.finished_at ASC NULLS FIRST, p.id \
         LIMIT $2",
    )
    .bind(i32::try_from(min_interval_minutes).unwrap_or(i32::MAX))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Tracked products that have never completed a check: the catch-up set for
/// freshly tracked items.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_never_checked_products(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<i64>, DbError> {
    let ids: Vec<i64> = sqlx::query_scalar(
        "SELECT p.id \
         FROM products p \
         WHERE EXISTS (SELECT 1 FROM tracked_items ti WHERE ti.product_id = p.id) \
           AND NOT EXISTS ( \
               SELECT 1 FROM check_runs cr \
               WHERE cr.product_id = p.id AND cr.finished_at IS NOT NULL) \
         ORDER BY p.id \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Drop finished runs older than the retention window.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn prune_finished_check_runs(
    pool: &PgPool,
    retention_days: u32,
) -> Result<u64, DbError> {
    let removed = sqlx::query(
        "DELETE FROM check_runs \
         WHERE finished_at IS NOT NULL \
           AND finished_at < NOW() - make_interval(days => $1)",
    )
    .bind(i32::try_from(retention_days).unwrap_or(i32::MAX))
    .execute(pool)
    .await?
    .rows_affected();

    Ok(removed)
}
