use shelfwatch_core::AppConfig;
use sqlx::migrate::Migrate;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;

// Path relative to crates/shelfwatch-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_secs: 10,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    #[error("check run {id} already finalized")]
    CheckRunAlreadyFinalized { id: i64 },
    #[error(transparent)]
    Config(#[from] shelfwatch_core::ConfigError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Run all pending migrations against the pool.
///
/// Returns the number of migrations that were applied.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    let applied_before = {
        let mut conn = pool.acquire().await?;
        conn.ensure_migrations_table().await?;
        conn.list_applied_migrations().await?.len()
    };

    MIGRATOR.run(pool).await?;

    let applied_after = {
        let mut conn = pool.acquire().await?;
        conn.ensure_migrations_table().await?;
        conn.list_applied_migrations().await?.len()
    };

    Ok(applied_after.saturating_sub(applied_before))
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// Run a full health check: ping the pool and return a typed error on failure.
///
/// # Errors
///
/// Returns [`DbError`] if the ping fails.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    ping(pool).await?;
    Ok(())
}


pub mod check_runs;
pub mod history;
pub mod ingest;
pub mod locks;
pub mod notifications;
pub mod products;
pub mod scheduler_logs;
pub mod tracked_items;
pub mod variants;

pub use check_runs::{
    create_check_run, finish_check_run, last_finished_at, list_due_products,
    list_never_checked_products, prune_finished_check_runs, CheckRunRow,
};
pub use history::{
    insert_price_history, insert_stock_history, latest_price_history, latest_stock_history,
    prune_history, PriceHistoryRow, StockHistoryRow,
};
pub use ingest::{ingest_snapshot, IngestOutcome};
pub use locks::{
    advisory_key, with_product_lock, LeaderLock, LockNamespace, MAIN_SCHEDULER_JOB_ID,
};
pub use notifications::{
    insert_notification, list_unsent_notifications, mark_notification_sent, NewNotification,
    NotificationRow,
};
pub use products::{find_product_by_url, get_product, insert_product, update_product_profile,
    NewProduct, ProductRow,
};
pub use scheduler_logs::{insert_scheduler_log, NewSchedulerLog};
pub use tracked_items::{list_watchers, upsert_tracked_item, TrackedItemRow};
pub use variants::{
    count_variants, find_variant_by_key, insert_variant, list_variants,
    update_variant_observation, VariantRow,
};
