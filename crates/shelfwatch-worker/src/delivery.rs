//! The delivery loop: scan unsent notifications, ship them through the
//! email sink, and mark each sent only after the sink confirms. Failures
//! leave the row pending for the next sweep.

use sqlx::PgPool;

use shelfwatch_db::{get_product, list_unsent_notifications, mark_notification_sent};

use crate::email::EmailSink;

/// How many notifications one delivery sweep will attempt.
const DELIVERY_BATCH: i64 = 100;

#[derive(Debug, Default)]
pub struct DeliveryStats {
    pub attempted: u32,
    pub delivered: u32,
    pub failed: u32,
}

/// Run one delivery sweep.
pub async fn run_delivery_sweep(pool: &PgPool, sink: &EmailSink) -> DeliveryStats {
    let mut stats = DeliveryStats::default();

    if !sink.is_configured() {
        tracing::debug!("delivery sweep: sink not configured; leaving notifications pending");
        return stats;
    }

    let pending = match list_unsent_notifications(pool, DELIVERY_BATCH).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(error = %e, "delivery sweep: failed to list unsent notifications");
            return stats;
        }
    };

    for notification in pending {
        stats.attempted += 1;

        let product = match get_product(pool, notification.product_id).await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(
                    notification_id = notification.id,
                    error = %e,
                    "delivery sweep: product lookup failed; will retry"
                );
                stats.failed += 1;
                continue;
            }
        };
        let product_name = product.name.as_deref().unwrap_or(&product.url);

        match sink.send(&notification, product_name, &product.url).await {
            Ok(()) => match mark_notification_sent(pool, notification.id).await {
                Ok(()) => {
                    stats.delivered += 1;
                }
                Err(e) => {
                    // The sink accepted it but the flag update failed; the
                    // next sweep will re-send. Duplicate delivery beats a
                    // silently lost notification.
                    tracing::error!(
                        notification_id = notification.id,
                        error = %e,
                        "delivered but failed to mark sent"
                    );
                    stats.failed += 1;
                }
            },
            Err(e) => {
                tracing::warn!(
                    notification_id = notification.id,
                    error = %e,
                    "notification delivery failed; will retry"
                );
                stats.failed += 1;
            }
        }
    }

    if stats.attempted > 0 {
        tracing::info!(
            attempted = stats.attempted,
            delivered = stats.delivered,
            failed = stats.failed,
            "delivery sweep complete"
        );
    }

    stats
}
