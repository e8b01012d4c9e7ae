//! Page fetching: a validated plain-HTTP path with a Shopify product-JSON
//! probe and a headless-browser fallback, all folded into a single
//! [`FetchResult`] contract that never surfaces an `Err` to the scheduler.

pub mod error;
pub mod fetcher;
pub(crate) mod http;
pub mod render;
pub(crate) mod shopify;

pub use error::FetchError;
pub use fetcher::{FetchConfig, Fetcher};
pub use render::{ChromeRenderer, PageRenderer, RenderedPage};

/// Upper bound on any HTML body this crate will hand downstream.
pub const MAX_HTML_BYTES: usize = 10 * 1024 * 1024;
