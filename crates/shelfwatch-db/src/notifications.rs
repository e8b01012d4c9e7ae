//! Database operations for the `notifications` outbox.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use shelfwatch_core::NotificationType;

use crate::DbError;

const NOTIFICATION_COLUMNS: &str = "id, user_id, product_id, variant_id, notification_type, \
     message, old_price, new_price, old_status, new_status, sent, sent_at, read, metadata, \
     created_at";

/// A row from the `notifications` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub variant_id: Option<i64>,
    /// `STOCK` / `PRICE` / `RESTOCK`.
    pub notification_type: String,
    pub message: String,
    pub old_price: Option<Decimal>,
    pub new_price: Option<Decimal>,
    pub old_status: Option<String>,
    pub new_status: Option<String>,
    pub sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub read: bool,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Fields for a freshly created notification; `sent`/`read` default false.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: i64,
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub notification_type: NotificationType,
    pub message: String,
    pub old_price: Option<Decimal>,
    pub new_price: Option<Decimal>,
    pub old_status: Option<String>,
    pub new_status: Option<String>,
    pub metadata: serde_json::Value,
}

/// Insert a pending notification inside the ingestion transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_notification(
    conn: &mut PgConnection,
    new: &NewNotification,
) -> Result<NotificationRow, DbError> {
    let row = sqlx::query_as::<_, NotificationRow>(&format!(
        "INSERT INTO notifications \
             (user_id, product_id, variant_id, notification_type, message, \
              old_price, new_price, old_status, new_status, metadata) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10::jsonb) \
         RETURNING {NOTIFICATION_COLUMNS}"
    ))
    .bind(new.user_id)
    .bind(new.product_id)
    .bind(new.variant_id)
    .bind(new.notification_type.as_str())
    .bind(&new.message)
    .bind(new.old_price)
    .bind(new.new_price)
    .bind(&new.old_status)
    .bind(&new.new_status)
    .bind(&new.metadata)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// Pending notifications for the delivery loop, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_unsent_notifications(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<NotificationRow>, DbError> {
    let rows = sqlx::query_as::<_, NotificationRow>(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
         WHERE NOT sent \
         ORDER BY created_at ASC, id ASC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Mark a notification delivered. Failed sends leave the row untouched so
/// the next delivery sweep retries it.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] when the row does not exist or was already
/// sent, [`DbError::Sqlx`] on query failure.
pub async fn mark_notification_sent(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE notifications SET sent = TRUE, sent_at = NOW() \
         WHERE id = $1 AND NOT sent",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
