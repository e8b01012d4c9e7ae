//! One-off check and dry-run extraction for a single URL.
//!
//! These are operator overrides: they bypass the per-product lock and the
//! throttle window on purpose, so a suspicious page can be re-checked
//! immediately without waiting out the scheduler.

use shelfwatch_core::ProductSnapshot;
use shelfwatch_fetch::{FetchConfig, Fetcher};

/// Fetch, extract, and ingest one URL, printing what changed.
pub async fn run_check(url: &str) -> anyhow::Result<()> {
    let config = shelfwatch_core::load_app_config()?;
    let pool_config = shelfwatch_db::PoolConfig::from_app_config(&config);
    let pool = shelfwatch_db::connect_pool(&config.database_url, pool_config).await?;

    let fetcher = Fetcher::new(FetchConfig::from_app_config(&config))?;
    let result = fetcher.fetch(url).await;

    if !result.success {
        anyhow::bail!(
            "fetch failed ({}): {}",
            result.mode,
            result.error.as_deref().unwrap_or("no detail")
        );
    }

    let snapshot = shelfwatch_extract::extract(&result);
    print_snapshot_summary(&snapshot);

    let outcome =
        shelfwatch_db::ingest_snapshot(&pool, &snapshot, config.check_lock_timeout_seconds)
            .await?;

    println!();
    println!("product #{} ({})", outcome.product.id, outcome.product.url);
    println!(
        "  variants: {} ({} new), price changes: {}, stock changes: {}",
        outcome.variants.len(),
        outcome.new_variants,
        outcome.price_changes,
        outcome.stock_changes
    );
    println!("  notifications created: {}", outcome.notifications.len());
    for notification in &outcome.notifications {
        println!(
            "    [{}] user {}: {}",
            notification.notification_type, notification.user_id, notification.message
        );
    }

    Ok(())
}

/// Fetch and extract without touching the database.
pub async fn run_extract(url: &str, as_json: bool) -> anyhow::Result<()> {
    let config = shelfwatch_core::load_app_config()?;
    let fetcher = Fetcher::new(FetchConfig::from_app_config(&config))?;
    let result = fetcher.fetch(url).await;

    if !result.success {
        anyhow::bail!(
            "fetch failed ({}): {}",
            result.mode,
            result.error.as_deref().unwrap_or("no detail")
        );
    }

    let snapshot = shelfwatch_extract::extract(&result);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("fetched via {} mode", result.mode);
        print_snapshot_summary(&snapshot);
        if !snapshot.notes.is_empty() {
            println!("notes:");
            for note in &snapshot.notes {
                println!("  - {note}");
            }
        }
    }

    Ok(())
}

fn print_snapshot_summary(snapshot: &ProductSnapshot) {
    println!("title: {}", snapshot.title.as_deref().unwrap_or("<none>"));
    match &snapshot.pricing {
        Some(pricing) => println!(
            "price: {} {} (via {})",
            pricing.amount,
            pricing.currency.as_deref().unwrap_or("?"),
            pricing.strategy
        ),
        None => println!("price: <none>"),
    }
    match &snapshot.stock {
        Some(stock) => println!("stock: {} (via {})", stock.status, stock.strategy),
        None => println!("stock: <none>"),
    }
    println!(
        "variants: {}, images: {}, dynamic: {}",
        snapshot.variants.len(),
        snapshot.images.len(),
        snapshot.metadata.is_likely_dynamic
    );
}
