//! In-memory extraction results shared between the extractor, ingestion, and
//! the worker. Nothing here touches the database; these are the shapes a
//! single page check produces before reconciliation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Hard cap on variants per product. Mis-extracted option sets can otherwise
/// cross-product into thousands of phantom variants.
pub const MAX_VARIANTS: usize = 100;

/// Hard cap on images retained per snapshot.
pub const MAX_IMAGES: usize = 10;

/// Stock status of a variant as observed on the page.
///
/// String forms are the on-the-wire/database values (`in_stock`, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    OutOfStock,
    LowStock,
    Backorder,
    Preorder,
    Unknown,
}

impl StockStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::OutOfStock => "out_of_stock",
            StockStatus::LowStock => "low_stock",
            StockStatus::Backorder => "backorder",
            StockStatus::Preorder => "preorder",
            StockStatus::Unknown => "unknown",
        }
    }

    /// Parse a persisted status string. Unrecognized values map to `Unknown`
    /// rather than failing: old rows must never poison a check.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "in_stock" => StockStatus::InStock,
            "out_of_stock" => StockStatus::OutOfStock,
            "low_stock" => StockStatus::LowStock,
            "backorder" => StockStatus::Backorder,
            "preorder" => StockStatus::Preorder,
            _ => StockStatus::Unknown,
        }
    }

    /// Whether a buyer could complete a purchase right now.
    #[must_use]
    pub fn is_available(self) -> bool {
        matches!(self, StockStatus::InStock | StockStatus::LowStock)
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification event type, uppercase on the wire (`STOCK`, `PRICE`, `RESTOCK`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    Stock,
    Price,
    Restock,
}

impl NotificationType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationType::Stock => "STOCK",
            NotificationType::Price => "PRICE",
            NotificationType::Restock => "RESTOCK",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of a check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Success,
    Failed,
    Partial,
}

impl CheckStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CheckStatus::Success => "success",
            CheckStatus::Failed => "failed",
            CheckStatus::Partial => "partial",
        }
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one page check extracted, before any database reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSnapshot {
    /// URL the check was requested for.
    pub url: String,
    /// Post-redirect URL, when it differs from `url`.
    pub final_url: Option<String>,
    pub fetched_at: DateTime<Utc>,

    pub title: Option<String>,
    pub description: Option<String>,
    /// At most [`MAX_IMAGES`] entries, first is the main image.
    pub images: Vec<String>,

    /// At most [`MAX_VARIANTS`] entries.
    pub variants: Vec<VariantShell>,
    /// Product-level price, when one was recoverable.
    pub pricing: Option<PriceShell>,
    /// Product-level stock signal, when one was recoverable.
    pub stock: Option<StockShell>,

    /// Diagnostic trail from every strategy that ran, winning or not.
    pub notes: Vec<String>,
    pub metadata: SnapshotMetadata,
}

impl ProductSnapshot {
    /// An empty snapshot for a URL, used as the starting point by the
    /// extractor and as the ingestion input when extraction found nothing.
    #[must_use]
    pub fn empty(url: impl Into<String>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            final_url: None,
            fetched_at,
            title: None,
            description: None,
            images: Vec::new(),
            variants: Vec::new(),
            pricing: None,
            stock: None,
            notes: Vec::new(),
            metadata: SnapshotMetadata::default(),
        }
    }
}

/// Snapshot-level diagnostics that ride along into check-run metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub is_likely_dynamic: bool,
    pub dynamic_indicators: Vec<String>,
    pub json_blob_count: usize,
}

/// A purchasable configuration recovered from the page, keyed by its
/// attribute map (`{size: "M", color: "Blue"}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantShell {
    pub sku: Option<String>,
    /// Sorted option name → value map; the natural key within a product.
    pub attributes: BTreeMap<String, String>,
    /// Per-variant price when the source carried one; `None` means "only a
    /// product-level price was visible" and leaves the stored price alone.
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub stock_status: Option<StockStatus>,
    pub available: Option<bool>,
}

impl VariantShell {
    /// Canonical string form of the attribute map, used as the variant's
    /// natural key in storage (`color=Blue|size=M`). `BTreeMap` iteration
    /// order makes this deterministic.
    #[must_use]
    pub fn attributes_key(&self) -> String {
        attributes_key(&self.attributes)
    }
}

/// Canonical serialization of an attribute map. Shared with ingestion so the
/// lookup key and the stored key can never drift apart.
#[must_use]
pub fn attributes_key(attributes: &BTreeMap<String, String>) -> String {
    if attributes.is_empty() {
        return "default".to_string();
    }
    attributes
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("|")
}

/// A price recovered by the extraction cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceShell {
    pub amount: Decimal,
    /// ISO 4217 code when detectable.
    pub currency: Option<String>,
    /// The original string the amount was parsed from.
    pub raw: String,
    /// Name of the strategy that produced this result.
    pub strategy: String,
}

/// A stock decision recovered by the extraction cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockShell {
    pub status: StockStatus,
    /// The page text the decision was based on, when there was one.
    pub raw: Option<String>,
    /// Name of the strategy that produced this result.
    pub strategy: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_status_round_trips_through_strings() {
        for status in [
            StockStatus::InStock,
            StockStatus::OutOfStock,
            StockStatus::LowStock,
            StockStatus::Backorder,
            StockStatus::Preorder,
            StockStatus::Unknown,
        ] {
            assert_eq!(StockStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn stock_status_parse_tolerates_garbage() {
        assert_eq!(StockStatus::parse("definitely-not-a-status"), StockStatus::Unknown);
        assert_eq!(StockStatus::parse(""), StockStatus::Unknown);
    }

    #[test]
    fn availability_follows_status() {
        assert!(StockStatus::InStock.is_available());
        assert!(StockStatus::LowStock.is_available());
        assert!(!StockStatus::OutOfStock.is_available());
        assert!(!StockStatus::Backorder.is_available());
        assert!(!StockStatus::Preorder.is_available());
        assert!(!StockStatus::Unknown.is_available());
    }

    #[test]
    fn notification_type_is_uppercase_on_the_wire() {
        assert_eq!(NotificationType::Stock.as_str(), "STOCK");
        assert_eq!(NotificationType::Price.as_str(), "PRICE");
        assert_eq!(NotificationType::Restock.as_str(), "RESTOCK");
    }

    #[test]
    fn attributes_key_is_sorted_and_stable() {
        let mut attrs = BTreeMap::new();
        attrs.insert("size".to_string(), "M".to_string());
        attrs.insert("color".to_string(), "Blue".to_string());
        assert_eq!(attributes_key(&attrs), "color=Blue|size=M");
    }

    #[test]
    fn attributes_key_for_attributeless_variant_is_default() {
        assert_eq!(attributes_key(&BTreeMap::new()), "default");
    }

    #[test]
    fn snapshot_serde_round_trip() {
        let mut snapshot = ProductSnapshot::empty("https://shop.example/p/1", Utc::now());
        snapshot.title = Some("Test Tee".to_string());
        snapshot.pricing = Some(PriceShell {
            amount: Decimal::new(2999, 2),
            currency: Some("USD".to_string()),
            raw: "$29.99".to_string(),
            strategy: "json-price".to_string(),
        });

        let json = serde_json::to_string(&snapshot).expect("serialize");
        let decoded: ProductSnapshot = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded.title.as_deref(), Some("Test Tee"));
        assert_eq!(
            decoded.pricing.expect("pricing").amount,
            Decimal::new(2999, 2)
        );
    }
}
