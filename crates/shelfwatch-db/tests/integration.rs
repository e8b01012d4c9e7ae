//! Offline unit tests for shelfwatch-db pool configuration and row types.
//! These tests do not require a live database connection.

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use shelfwatch_core::StockStatus;
use shelfwatch_db::{
    advisory_key, CheckRunRow, LockNamespace, NotificationRow, PoolConfig, ProductRow,
    TrackedItemRow, VariantRow, MAIN_SCHEDULER_JOB_ID,
};

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let mut config = test_app_config();
    config.db_max_connections = 42;
    config.db_min_connections = 7;
    config.db_acquire_timeout_secs = 9;

    let pool_config = PoolConfig::from_app_config(&config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test: confirm that [`ProductRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn product_row_has_expected_fields() {
    let row = ProductRow {
        id: 1_i64,
        url: "https://shop.example/products/tee".to_string(),
        canonical_url: Some("https://shop.example/p/tee".to_string()),
        name: Some("Test Tee".to_string()),
        description: None,
        vendor: None,
        main_image_url: Some("https://img/a.jpg".to_string()),
        metadata: json!({}),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    assert_eq!(row.id, 1);
    assert_eq!(row.url, "https://shop.example/products/tee");
    assert_eq!(row.canonical_url.as_deref(), Some("https://shop.example/p/tee"));
    assert_eq!(row.name.as_deref(), Some("Test Tee"));
}

/// Compile-time smoke test for [`VariantRow`], including the typed stock
/// status accessor.
#[test]
fn variant_row_stock_status_parses() {
    let row = VariantRow {
        id: 10_i64,
        product_id: 1_i64,
        sku: Some("TEE-M".to_string()),
        attributes: json!({"size": "M"}),
        attributes_key: "size=M".to_string(),
        currency: Some("USD".to_string()),
        current_price: Some(Decimal::new(2999, 2)),
        current_stock_status: "in_stock".to_string(),
        is_available: true,
        last_checked_at: Some(Utc::now()),
        metadata: json!({}),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    assert_eq!(row.stock_status(), StockStatus::InStock);
    assert_eq!(row.attributes_key, "size=M");
}

#[test]
fn variant_row_unknown_status_is_tolerated() {
    let row = VariantRow {
        id: 11_i64,
        product_id: 1_i64,
        sku: None,
        attributes: json!({}),
        attributes_key: "default".to_string(),
        currency: None,
        current_price: None,
        current_stock_status: "something-from-the-future".to_string(),
        is_available: false,
        last_checked_at: None,
        metadata: json!({}),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    assert_eq!(row.stock_status(), StockStatus::Unknown);
}

/// An in-flight check run has `NULL` status and `NULL` finished_at.
#[test]
fn check_run_row_in_flight_shape() {
    let row = CheckRunRow {
        id: 5_i64,
        public_id: Uuid::new_v4(),
        product_id: 1_i64,
        started_at: Utc::now(),
        finished_at: None,
        status: None,
        error_message: None,
        metadata: json!({}),
    };

    assert!(row.status.is_none());
    assert!(row.finished_at.is_none());
    assert!(row.error_message.is_none());
}

#[test]
fn tracked_item_row_defaults_shape() {
    let row = TrackedItemRow {
        id: 3_i64,
        user_id: 77_i64,
        product_id: 1_i64,
        variant_id: None,
        threshold_percentage: Decimal::from(10),
        notify_on_price_rise: false,
        created_at: Utc::now(),
    };

    assert!(row.variant_id.is_none(), "whole-product subscription");
    assert_eq!(row.threshold_percentage, Decimal::from(10));
    assert!(!row.notify_on_price_rise);
}

#[test]
fn notification_row_new_shape() {
    let row = NotificationRow {
        id: 9_i64,
        user_id: 77_i64,
        product_id: 1_i64,
        variant_id: Some(10_i64),
        notification_type: "RESTOCK".to_string(),
        message: "Test Tee is back in stock".to_string(),
        old_price: None,
        new_price: None,
        old_status: Some("out_of_stock".to_string()),
        new_status: Some("in_stock".to_string()),
        sent: false,
        sent_at: None,
        read: false,
        metadata: json!({}),
        created_at: Utc::now(),
    };

    assert!(!row.sent);
    assert!(!row.read);
    assert_eq!(row.old_status.as_deref(), Some("out_of_stock"));
    assert_eq!(row.new_status.as_deref(), Some("in_stock"));
}

#[test]
fn advisory_keys_do_not_collide_across_namespaces() {
    let leader = advisory_key(LockNamespace::Scheduler, MAIN_SCHEDULER_JOB_ID);
    let product_zero = advisory_key(LockNamespace::ProductCheck, 0);
    assert_ne!(leader, product_zero);
}

fn test_app_config() -> shelfwatch_core::AppConfig {
    shelfwatch_core::AppConfig {
        database_url: "postgres://example".to_string(),
        log_level: "info".to_string(),
        db_max_connections: 10,
        db_min_connections: 1,
        db_acquire_timeout_secs: 10,
        enable_scheduler: true,
        enable_check_scheduler: true,
        enable_email_scheduler: true,
        enable_tracking_scheduler: true,
        enable_retention_scheduler: true,
        check_interval_minutes: 30,
        email_delivery_interval_minutes: 5,
        tracking_interval_minutes: 10,
        retention_interval_hours: 24,
        retention_days: 90,
        min_check_interval_minutes: 30,
        max_products_per_run: 50,
        check_lock_timeout_seconds: 300,
        tracking_concurrency: 5,
        disable_rendered_fetch: false,
        fetch_timeout_secs: 10,
        render_timeout_secs: 15,
        fetch_deadline_secs: 20,
        fetch_user_agent: "test".to_string(),
        worker_port: 9090,
        email_webhook_url: None,
    }
}
