//! Database operations for `scheduler_logs`: one row per sweep.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// Summary of one completed sweep.
#[derive(Debug, Clone)]
pub struct NewSchedulerLog {
    pub run_started_at: DateTime<Utc>,
    pub run_finished_at: DateTime<Utc>,
    pub products_checked: i32,
    pub items_checked: i32,
    pub success: bool,
    pub error: Option<String>,
    pub metadata: serde_json::Value,
}

/// Record a sweep summary.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_scheduler_log(pool: &PgPool, log: &NewSchedulerLog) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO scheduler_logs \
             (run_started_at, run_finished_at, products_checked, items_checked, \
              success, error, metadata) \
         VALUES ($1, $2, $3, $4, $5, $6, $7::jsonb)",
    )
    .bind(log.run_started_at)
    .bind(log.run_finished_at)
    .bind(log.products_checked)
    .bind(log.items_checked)
    .bind(log.success)
    .bind(&log.error)
    .bind(&log.metadata)
    .execute(pool)
    .await?;

    Ok(())
}
