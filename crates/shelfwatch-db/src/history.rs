//! Append-only time series: `variant_price_history` and
//! `variant_stock_history`. Rows are never updated or rewritten; readers
//! order by `recorded_at DESC, id DESC` so ties break on insertion order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use shelfwatch_core::StockStatus;

use crate::DbError;

/// A row from `variant_price_history`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PriceHistoryRow {
    pub id: i64,
    pub variant_id: i64,
    pub recorded_at: DateTime<Utc>,
    pub price: Decimal,
    pub currency: Option<String>,
    /// The original string the price was parsed from.
    pub raw: Option<String>,
    pub metadata: serde_json::Value,
}

/// A row from `variant_stock_history`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StockHistoryRow {
    pub id: i64,
    pub variant_id: i64,
    pub recorded_at: DateTime<Utc>,
    pub status: String,
    pub raw: Option<String>,
    pub metadata: serde_json::Value,
}

/// Append a price observation.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_price_history(
    conn: &mut PgConnection,
    variant_id: i64,
    price: Decimal,
    currency: Option<&str>,
    raw: Option<&str>,
    metadata: &serde_json::Value,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO variant_price_history (variant_id, price, currency, raw, metadata) \
         VALUES ($1, $2, $3, $4, $5::jsonb)",
    )
    .bind(variant_id)
    .bind(price)
    .bind(currency)
    .bind(raw)
    .bind(metadata)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Append a stock observation.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_stock_history(
    conn: &mut PgConnection,
    variant_id: i64,
    status: StockStatus,
    raw: Option<&str>,
    metadata: &serde_json::Value,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO variant_stock_history (variant_id, status, raw, metadata) \
         VALUES ($1, $2, $3, $4::jsonb)",
    )
    .bind(variant_id)
    .bind(status.as_str())
    .bind(raw)
    .bind(metadata)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Latest price row for a variant, ties broken by insertion id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_price_history(
    pool: &PgPool,
    variant_id: i64,
) -> Result<Option<PriceHistoryRow>, DbError> {
    let row = sqlx::query_as::<_, PriceHistoryRow>(
        "SELECT id, variant_id, recorded_at, price, currency, raw, metadata \
         FROM variant_price_history \
         WHERE variant_id = $1 \
         ORDER BY recorded_at DESC, id DESC \
         LIMIT 1",
    )
    .bind(variant_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Latest stock row for a variant, ties broken by insertion id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_stock_history(
    pool: &PgPool,
    variant_id: i64,
) -> Result<Option<StockHistoryRow>, DbError> {
    let row = sqlx::query_as::<_, StockHistoryRow>(
        "SELECT id, variant_id, recorded_at, status, raw, metadata \
         FROM variant_stock_history \
         WHERE variant_id = $1 \
         ORDER BY recorded_at DESC, id DESC \
         LIMIT 1",
    )
    .bind(variant_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Drop history rows older than the retention window. Returns how many rows
/// were removed across both tables.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either delete fails.
pub async fn prune_history(pool: &PgPool, retention_days: u32) -> Result<u64, DbError> {
    let price = sqlx::query(
        "DELETE FROM variant_price_history \
         WHERE recorded_at < NOW() - make_interval(days => $1)",
    )
    .bind(i32::try_from(retention_days).unwrap_or(i32::MAX))
    .execute(pool)
    .await?
    .rows_affected();

    let stock = sqlx::query(
        "DELETE FROM variant_stock_history \
         WHERE recorded_at < NOW() - make_interval(days => $1)",
    )
    .bind(i32::try_from(retention_days).unwrap_or(i32::MAX))
    .execute(pool)
    .await?
    .rows_affected();

    Ok(price + stock)
}
