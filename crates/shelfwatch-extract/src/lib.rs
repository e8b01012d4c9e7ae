//! Snapshot extraction: wraps fetched HTML in a queryable element index,
//! harvests embedded JSON, and runs the strategy cascades that recover
//! title, images, variants, price, and stock status.

pub mod dom;
pub mod dynamic;
pub mod embedded_json;
pub mod extractor;
pub mod meta;
pub mod money;
pub mod patterns;
pub mod price;
pub mod stock;
pub mod strategy;
pub mod text;
pub mod variants;

pub use dom::Dom;
pub use extractor::extract;
pub use strategy::{ExtractionContext, Strategy, StrategyOutcome};

/// Upper bound on HTML handed to the parser; larger inputs are truncated.
pub const MAX_HTML_BYTES: usize = 10 * 1024 * 1024;
