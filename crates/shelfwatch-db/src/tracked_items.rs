//! Database operations for `tracked_items`.
//!
//! Tracked items are written by the external user-facing service; the core
//! reads them to decide who gets notified and which products are due. The
//! upsert exists for operator tooling and tests.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::DbError;

const TRACKED_ITEM_COLUMNS: &str =
    "id, user_id, product_id, variant_id, threshold_percentage, notify_on_price_rise, created_at";

/// A row from the `tracked_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrackedItemRow {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    /// `NULL` tracks the whole product.
    pub variant_id: Option<i64>,
    /// Price-drop percentage below which no PRICE notification fires.
    pub threshold_percentage: Decimal,
    pub notify_on_price_rise: bool,
    pub created_at: DateTime<Utc>,
}

/// Subscriptions that watch a specific variant: rows pinned to it plus
/// whole-product rows.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_watchers(
    conn: &mut PgConnection,
    product_id: i64,
    variant_id: i64,
) -> Result<Vec<TrackedItemRow>, DbError> {
    let rows = sqlx::query_as::<_, TrackedItemRow>(&format!(
        "SELECT {TRACKED_ITEM_COLUMNS} FROM tracked_items \
         WHERE product_id = $1 AND (variant_id IS NULL OR variant_id = $2) \
         ORDER BY id"
    ))
    .bind(product_id)
    .bind(variant_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// Create or refresh a subscription. Conflicts on the
/// `(user, product, variant)` identity update the settings in place.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_tracked_item(
    pool: &PgPool,
    user_id: i64,
    product_id: i64,
    variant_id: Option<i64>,
    threshold_percentage: Option<Decimal>,
    notify_on_price_rise: bool,
) -> Result<TrackedItemRow, DbError> {
    let row = sqlx::query_as::<_, TrackedItemRow>(&format!(
        "INSERT INTO tracked_items \
             (user_id, product_id, variant_id, threshold_percentage, notify_on_price_rise) \
         VALUES ($1, $2, $3, COALESCE($4, 10), $5) \
         ON CONFLICT (user_id, product_id, variant_id) DO UPDATE SET \
             threshold_percentage = EXCLUDED.threshold_percentage, \
             notify_on_price_rise = EXCLUDED.notify_on_price_rise \
         RETURNING {TRACKED_ITEM_COLUMNS}"
    ))
    .bind(user_id)
    .bind(product_id)
    .bind(variant_id)
    .bind(threshold_percentage)
    .bind(notify_on_price_rise)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
