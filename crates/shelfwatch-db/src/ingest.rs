//! Snapshot ingestion: reconcile one extracted [`ProductSnapshot`] with the
//! persisted model inside a single transaction.
//!
//! Observers see either the pre-check state or the fully ingested state,
//! never updated variants with stale history. Any failure aborts the whole
//! check; the caller records a failed check run.

use rust_decimal::Decimal;
use serde_json::json;
use sqlx::{PgConnection, PgPool};

use shelfwatch_core::{
    NotificationType, ProductSnapshot, StockStatus, VariantShell, MAX_VARIANTS,
};

use crate::notifications::{insert_notification, NewNotification, NotificationRow};
use crate::products::{self, NewProduct, ProductRow};
use crate::tracked_items::list_watchers;
use crate::variants::{self, VariantRow};
use crate::{history, DbError};

/// Everything one ingestion produced.
#[derive(Debug)]
pub struct IngestOutcome {
    pub product: ProductRow,
    pub variants: Vec<VariantRow>,
    pub notifications: Vec<NotificationRow>,
    pub new_variants: u32,
    pub price_changes: u32,
    pub stock_changes: u32,
}

/// Ingest a snapshot. `lock_timeout_secs` bounds how long the transaction
/// may wait on row locks so a stuck peer cannot starve the worker forever.
///
/// # Errors
///
/// Returns [`DbError`] on any database failure; the transaction is rolled
/// back and no partial state is visible.
pub async fn ingest_snapshot(
    pool: &PgPool,
    snapshot: &ProductSnapshot,
    lock_timeout_secs: u64,
) -> Result<IngestOutcome, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query(&format!("SET LOCAL lock_timeout = '{lock_timeout_secs}s'"))
        .execute(&mut *tx)
        .await?;

    let product = find_or_create_product(&mut tx, snapshot).await?;

    let mut out = IngestOutcome {
        product,
        variants: Vec::new(),
        notifications: Vec::new(),
        new_variants: 0,
        price_changes: 0,
        stock_changes: 0,
    };

    for shell in snapshot.variants.iter().take(MAX_VARIANTS) {
        reconcile_variant(&mut tx, snapshot, shell, &mut out).await?;
    }

    tx.commit().await?;

    tracing::info!(
        product_id = out.product.id,
        variants = out.variants.len(),
        new_variants = out.new_variants,
        price_changes = out.price_changes,
        stock_changes = out.stock_changes,
        notifications = out.notifications.len(),
        "snapshot ingested"
    );

    Ok(out)
}

/// Match by `url`, then by `canonical_url`; update the profile on a hit,
/// insert on a miss.
async fn find_or_create_product(
    tx: &mut PgConnection,
    snapshot: &ProductSnapshot,
) -> Result<ProductRow, DbError> {
    let metadata = product_metadata(snapshot);
    let main_image = snapshot.images.first().map(String::as_str);

    let existing =
        products::find_product_by_url(tx, &snapshot.url, snapshot.final_url.as_deref()).await?;

    match existing {
        Some(row) => {
            products::update_product_profile(
                tx,
                row.id,
                snapshot.final_url.as_deref(),
                snapshot.title.as_deref(),
                snapshot.description.as_deref(),
                None,
                main_image,
                &metadata,
            )
            .await
        }
        None => {
            products::insert_product(
                tx,
                &NewProduct {
                    url: &snapshot.url,
                    canonical_url: snapshot.final_url.as_deref(),
                    name: snapshot.title.as_deref(),
                    description: snapshot.description.as_deref(),
                    vendor: None,
                    main_image_url: main_image,
                    metadata,
                },
            )
            .await
        }
    }
}

/// Product-level metadata recorded on every check. The product-level price
/// deliberately lives here and never overwrites per-variant prices.
fn product_metadata(snapshot: &ProductSnapshot) -> serde_json::Value {
    let mut metadata = serde_json::Map::new();
    if let Some(pricing) = &snapshot.pricing {
        metadata.insert(
            "last_product_price".to_string(),
            json!(pricing.amount.to_string()),
        );
        metadata.insert("price_strategy".to_string(), json!(pricing.strategy));
        if let Some(currency) = &pricing.currency {
            metadata.insert("last_product_currency".to_string(), json!(currency));
        }
    }
    if let Some(stock) = &snapshot.stock {
        metadata.insert("stock_strategy".to_string(), json!(stock.strategy));
    }
    if snapshot.metadata.is_likely_dynamic {
        metadata.insert("is_likely_dynamic".to_string(), json!(true));
    }
    serde_json::Value::Object(metadata)
}

async fn reconcile_variant(
    tx: &mut PgConnection,
    snapshot: &ProductSnapshot,
    shell: &VariantShell,
    out: &mut IngestOutcome,
) -> Result<(), DbError> {
    let key = shell.attributes_key();
    let product_id = out.product.id;

    // Product-level stock fills in for shells that carried none; the
    // product-level price never does (see the variant update contract).
    let observed_status = shell
        .stock_status
        .or(snapshot.stock.as_ref().map(|s| s.status));

    let existing = variants::find_variant_by_key(tx, product_id, &key).await?;

    match existing {
        None => {
            let existing_count = variants::count_variants(tx, product_id).await?;
            if existing_count >= MAX_VARIANTS as i64 {
                tracing::warn!(
                    product_id,
                    attributes_key = %key,
                    "variant cap reached; ignoring new attribute set"
                );
                return Ok(());
            }

            let mut seeded = shell.clone();
            if seeded.stock_status.is_none() {
                seeded.stock_status = observed_status;
            }
            let row = variants::insert_variant(tx, product_id, &seeded).await?;

            // First observation: seed the time series, notify nobody.
            if let Some(price) = shell.price {
                history::insert_price_history(
                    tx,
                    row.id,
                    price,
                    shell.currency.as_deref(),
                    None,
                    &json!({"source": "first-observation"}),
                )
                .await?;
            }
            let seeded_status = row.stock_status();
            if seeded_status != StockStatus::Unknown {
                history::insert_stock_history(
                    tx,
                    row.id,
                    seeded_status,
                    None,
                    &json!({"source": "first-observation"}),
                )
                .await?;
            }

            out.new_variants += 1;
            out.variants.push(row);
        }
        Some(existing) => {
            let old_price = existing.current_price;
            let old_status = existing.stock_status();

            let new_status = observed_status.unwrap_or(old_status);
            let is_available = shell.available.unwrap_or_else(|| new_status.is_available());

            let row = variants::update_variant_observation(
                tx,
                existing.id,
                shell.price,
                shell.currency.as_deref(),
                new_status,
                is_available,
            )
            .await?;

            if let Some(new_price) = shell.price {
                if old_price != Some(new_price) {
                    out.price_changes += 1;
                    history::insert_price_history(
                        tx,
                        row.id,
                        new_price,
                        shell.currency.as_deref(),
                        None,
                        &json!({}),
                    )
                    .await?;
                    notify_price_change(tx, snapshot, &row, old_price, new_price, out).await?;
                }
            }

            if observed_status.is_some() && new_status != old_status {
                out.stock_changes += 1;
                let raw = snapshot.stock.as_ref().and_then(|s| s.raw.clone());
                history::insert_stock_history(
                    tx,
                    row.id,
                    new_status,
                    raw.as_deref(),
                    &json!({}),
                )
                .await?;
                notify_stock_change(tx, snapshot, &row, old_status, new_status, out).await?;
            }

            out.variants.push(row);
        }
    }

    Ok(())
}

async fn notify_price_change(
    tx: &mut PgConnection,
    snapshot: &ProductSnapshot,
    variant: &VariantRow,
    old_price: Option<Decimal>,
    new_price: Decimal,
    out: &mut IngestOutcome,
) -> Result<(), DbError> {
    let watchers = list_watchers(tx, variant.product_id, variant.id).await?;
    if watchers.is_empty() {
        return Ok(());
    }

    let product_name = display_name(snapshot, &out.product).to_string();

    for watcher in watchers {
        let Some(old) = old_price else { continue };
        if !price_notification_due(
            old,
            new_price,
            watcher.threshold_percentage,
            watcher.notify_on_price_rise,
        ) {
            continue;
        }

        let message = if new_price < old {
            format!("{product_name}: price dropped from {old} to {new_price}")
        } else {
            format!("{product_name}: price rose from {old} to {new_price}")
        };

        let row = insert_notification(
            tx,
            &NewNotification {
                user_id: watcher.user_id,
                product_id: variant.product_id,
                variant_id: Some(variant.id),
                notification_type: NotificationType::Price,
                message,
                old_price: Some(old),
                new_price: Some(new_price),
                old_status: None,
                new_status: None,
                metadata: json!({"threshold_percentage": watcher.threshold_percentage.to_string()}),
            },
        )
        .await?;
        out.notifications.push(row);
    }

    Ok(())
}

async fn notify_stock_change(
    tx: &mut PgConnection,
    snapshot: &ProductSnapshot,
    variant: &VariantRow,
    old_status: StockStatus,
    new_status: StockStatus,
    out: &mut IngestOutcome,
) -> Result<(), DbError> {
    let Some(event) = stock_transition(old_status, new_status) else {
        return Ok(());
    };

    let watchers = list_watchers(tx, variant.product_id, variant.id).await?;
    if watchers.is_empty() {
        return Ok(());
    }

    let product_name = display_name(snapshot, &out.product).to_string();
    let message = match event {
        NotificationType::Restock => format!("{product_name} is back in stock"),
        _ => format!(
            "{product_name}: stock changed from {old_status} to {new_status}"
        ),
    };

    for watcher in watchers {
        let row = insert_notification(
            tx,
            &NewNotification {
                user_id: watcher.user_id,
                product_id: variant.product_id,
                variant_id: Some(variant.id),
                notification_type: event,
                message: message.clone(),
                old_price: None,
                new_price: None,
                old_status: Some(old_status.as_str().to_string()),
                new_status: Some(new_status.as_str().to_string()),
                metadata: json!({}),
            },
        )
        .await?;
        out.notifications.push(row);
    }

    Ok(())
}

fn display_name<'a>(snapshot: &'a ProductSnapshot, product: &'a ProductRow) -> &'a str {
    snapshot
        .title
        .as_deref()
        .or(product.name.as_deref())
        .unwrap_or(&product.url)
}

// ---------------------------------------------------------------------------
// Change-detection rules (pure)
// ---------------------------------------------------------------------------

/// Which event a stock transition produces. Returning to shelf from
/// `out_of_stock` is a RESTOCK; every other real transition is STOCK.
fn stock_transition(old: StockStatus, new: StockStatus) -> Option<NotificationType> {
    if old == new {
        return None;
    }
    match (old, new) {
        (StockStatus::OutOfStock, StockStatus::InStock | StockStatus::LowStock) => {
            Some(NotificationType::Restock)
        }
        _ => Some(NotificationType::Stock),
    }
}

/// Whether a price change crosses the watcher's notification threshold.
/// Drops always compare against the threshold; rises only when the watcher
/// opted in.
fn price_notification_due(
    old: Decimal,
    new: Decimal,
    threshold_percentage: Decimal,
    notify_on_price_rise: bool,
) -> bool {
    if old <= Decimal::ZERO || old == new {
        return false;
    }
    let percent = (old - new).abs() * Decimal::from(100) / old;
    if new < old {
        percent >= threshold_percentage
    } else {
        notify_on_price_rise && percent >= threshold_percentage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("decimal literal")
    }

    // -----------------------------------------------------------------------
    // stock_transition
    // -----------------------------------------------------------------------

    #[test]
    fn restock_is_out_of_stock_to_purchasable() {
        assert_eq!(
            stock_transition(StockStatus::OutOfStock, StockStatus::InStock),
            Some(NotificationType::Restock)
        );
        assert_eq!(
            stock_transition(StockStatus::OutOfStock, StockStatus::LowStock),
            Some(NotificationType::Restock)
        );
    }

    #[test]
    fn going_out_of_stock_is_a_stock_event() {
        assert_eq!(
            stock_transition(StockStatus::InStock, StockStatus::OutOfStock),
            Some(NotificationType::Stock)
        );
    }

    #[test]
    fn other_transitions_are_stock_events() {
        assert_eq!(
            stock_transition(StockStatus::InStock, StockStatus::LowStock),
            Some(NotificationType::Stock)
        );
        assert_eq!(
            stock_transition(StockStatus::Unknown, StockStatus::InStock),
            Some(NotificationType::Stock)
        );
        assert_eq!(
            stock_transition(StockStatus::OutOfStock, StockStatus::Backorder),
            Some(NotificationType::Stock)
        );
    }

    #[test]
    fn no_transition_no_event() {
        assert_eq!(stock_transition(StockStatus::InStock, StockStatus::InStock), None);
        assert_eq!(
            stock_transition(StockStatus::OutOfStock, StockStatus::OutOfStock),
            None
        );
    }

    // -----------------------------------------------------------------------
    // price_notification_due
    // -----------------------------------------------------------------------

    #[test]
    fn small_drop_stays_quiet() {
        // 100 → 95 is a 5% drop, under the default 10% threshold.
        assert!(!price_notification_due(dec("100.00"), dec("95.00"), dec("10"), false));
    }

    #[test]
    fn threshold_crossing_drop_notifies() {
        assert!(price_notification_due(dec("100.00"), dec("85.00"), dec("10"), false));
        // Exactly at threshold counts.
        assert!(price_notification_due(dec("100.00"), dec("90.00"), dec("10"), false));
    }

    #[test]
    fn rises_are_silent_unless_opted_in() {
        assert!(!price_notification_due(dec("100.00"), dec("150.00"), dec("10"), false));
        assert!(price_notification_due(dec("100.00"), dec("150.00"), dec("10"), true));
    }

    #[test]
    fn equal_and_degenerate_prices_never_notify() {
        assert!(!price_notification_due(dec("100.00"), dec("100.00"), dec("10"), true));
        assert!(!price_notification_due(dec("0"), dec("10.00"), dec("10"), true));
    }
}
