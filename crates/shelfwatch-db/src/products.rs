//! Database operations for the `products` table.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::DbError;

const PRODUCT_COLUMNS: &str = "id, url, canonical_url, name, description, vendor, \
     main_image_url, metadata, created_at, updated_at";

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    /// The URL the product was first registered under.
    pub url: String,
    /// Post-redirect URL once known; the dedup key across registrations.
    pub canonical_url: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub vendor: Option<String>,
    pub main_image_url: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a fresh product row; everything else defaults.
#[derive(Debug, Clone)]
pub struct NewProduct<'a> {
    pub url: &'a str,
    pub canonical_url: Option<&'a str>,
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub vendor: Option<&'a str>,
    pub main_image_url: Option<&'a str>,
    pub metadata: serde_json::Value,
}

/// Look a product up by URL, then by canonical URL. Either form of the
/// address finds the row once the canonical URL is recorded.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_product_by_url(
    conn: &mut PgConnection,
    url: &str,
    canonical_url: Option<&str>,
) -> Result<Option<ProductRow>, DbError> {
    let by_url = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE url = $1 OR canonical_url = $1 LIMIT 1"
    ))
    .bind(url)
    .fetch_optional(&mut *conn)
    .await?;

    if by_url.is_some() {
        return Ok(by_url);
    }

    let Some(canonical) = canonical_url.filter(|c| *c != url) else {
        return Ok(None);
    };

    let by_canonical = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE url = $1 OR canonical_url = $1 LIMIT 1"
    ))
    .bind(canonical)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(by_canonical)
}

/// Fetch a product by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, [`DbError::Sqlx`] on
/// query failure.
pub async fn get_product(pool: &PgPool, id: i64) -> Result<ProductRow, DbError> {
    sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Insert a product created by a first successful extraction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including unique-URL
/// violations, which abort the surrounding check).
pub async fn insert_product(
    conn: &mut PgConnection,
    new: &NewProduct<'_>,
) -> Result<ProductRow, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "INSERT INTO products \
             (url, canonical_url, name, description, vendor, main_image_url, metadata) \
         VALUES ($1, $2, $3, $4, $5, $6, $7::jsonb) \
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(new.url)
    .bind(new.canonical_url)
    .bind(new.name)
    .bind(new.description)
    .bind(new.vendor)
    .bind(new.main_image_url)
    .bind(&new.metadata)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// Refresh a product's descriptive fields from a new snapshot. `NULL`
/// snapshot fields leave the stored value alone; metadata keys are merged.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_product_profile(
    conn: &mut PgConnection,
    id: i64,
    canonical_url: Option<&str>,
    name: Option<&str>,
    description: Option<&str>,
    vendor: Option<&str>,
    main_image_url: Option<&str>,
    metadata: &serde_json::Value,
) -> Result<ProductRow, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "UPDATE products SET \
             canonical_url  = COALESCE($2, canonical_url), \
             name           = COALESCE($3, name), \
             description    = COALESCE($4, description), \
             vendor         = COALESCE($5, vendor), \
             main_image_url = COALESCE($6, main_image_url), \
             metadata       = metadata || $7::jsonb, \
             updated_at     = NOW() \
         WHERE id = $1 \
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(id)
    .bind(canonical_url)
    .bind(name)
    .bind(description)
    .bind(vendor)
    .bind(main_image_url)
    .bind(metadata)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}
