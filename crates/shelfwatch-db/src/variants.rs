//! Database operations for the `product_variants` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use shelfwatch_core::{StockStatus, VariantShell};

use crate::DbError;

const VARIANT_COLUMNS: &str = "id, product_id, sku, attributes, attributes_key, currency, \
     current_price, current_stock_status, is_available, last_checked_at, metadata, \
     created_at, updated_at";

/// A row from the `product_variants` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VariantRow {
    pub id: i64,
    pub product_id: i64,
    pub sku: Option<String>,
    /// The attribute map as stored (`{"size": "M"}`).
    pub attributes: serde_json::Value,
    /// Canonical serialization of the sorted attribute map; the natural key
    /// within a product.
    pub attributes_key: String,
    pub currency: Option<String>,
    pub current_price: Option<Decimal>,
    pub current_stock_status: String,
    pub is_available: bool,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VariantRow {
    /// Typed view of the stored stock status.
    #[must_use]
    pub fn stock_status(&self) -> StockStatus {
        StockStatus::parse(&self.current_stock_status)
    }
}

/// Find a variant by its natural key within a product.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_variant_by_key(
    conn: &mut PgConnection,
    product_id: i64,
    attributes_key: &str,
) -> Result<Option<VariantRow>, DbError> {
    let row = sqlx::query_as::<_, VariantRow>(&format!(
        "SELECT {VARIANT_COLUMNS} FROM product_variants \
         WHERE product_id = $1 AND attributes_key = $2"
    ))
    .bind(product_id)
    .bind(attributes_key)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

/// Number of variants a product currently has, for the cap check.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_variants(conn: &mut PgConnection, product_id: i64) -> Result<i64, DbError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM product_variants WHERE product_id = $1")
            .bind(product_id)
            .fetch_one(&mut *conn)
            .await?;
    Ok(count)
}

/// Insert a variant first observed in `shell`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including natural-key
/// collisions, which abort the surrounding check).
pub async fn insert_variant(
    conn: &mut PgConnection,
    product_id: i64,
    shell: &VariantShell,
) -> Result<VariantRow, DbError> {
    let status = shell.stock_status.unwrap_or(StockStatus::Unknown);
    let is_available = shell
        .available
        .unwrap_or_else(|| status.is_available());

    let row = sqlx::query_as::<_, VariantRow>(&format!(
        "INSERT INTO product_variants \
             (product_id, sku, attributes, attributes_key, currency, current_price, \
              current_stock_status, is_available, last_checked_at) \
         VALUES ($1, $2, $3::jsonb, $4, $5, $6, $7, $8, NOW()) \
         RETURNING {VARIANT_COLUMNS}"
    ))
    .bind(product_id)
    .bind(&shell.sku)
    .bind(serde_json::to_value(&shell.attributes).unwrap_or_default())
    .bind(shell.attributes_key())
    .bind(&shell.currency)
    .bind(shell.price)
    .bind(status.as_str())
    .bind(is_available)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// Apply a fresh observation to an existing variant. `NULL` price/currency
/// leave the stored values alone (product-level-only snapshots must not
/// erase per-variant prices); the status and availability always refresh.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_variant_observation(
    conn: &mut PgConnection,
    id: i64,
    price: Option<Decimal>,
    currency: Option<&str>,
    stock_status: StockStatus,
    is_available: bool,
) -> Result<VariantRow, DbError> {
    let row = sqlx::query_as::<_, VariantRow>(&format!(
        "UPDATE product_variants SET \
             current_price        = COALESCE($2, current_price), \
             currency             = COALESCE($3, currency), \
             current_stock_status = $4, \
             is_available         = $5, \
             last_checked_at      = NOW(), \
             updated_at           = NOW() \
         WHERE id = $1 \
         RETURNING {VARIANT_COLUMNS}"
    ))
    .bind(id)
    .bind(price)
    .bind(currency)
    .bind(stock_status.as_str())
    .bind(is_available)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// All variants of a product, stable order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_variants(pool: &PgPool, product_id: i64) -> Result<Vec<VariantRow>, DbError> {
    let rows = sqlx::query_as::<_, VariantRow>(&format!(
        "SELECT {VARIANT_COLUMNS} FROM product_variants \
         WHERE product_id = $1 ORDER BY id"
    ))
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
