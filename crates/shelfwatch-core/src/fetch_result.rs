//! The fetcher's output contract. The fetcher itself never returns `Err` to
//! its caller; every failure mode collapses into a [`FetchResult`] with
//! `success: false` and a diagnostic `error` string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which path produced the page content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    Http,
    Rendered,
    Failed,
}

impl FetchMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FetchMode::Http => "http",
            FetchMode::Rendered => "rendered",
            FetchMode::Failed => "failed",
        }
    }
}

impl std::fmt::Display for FetchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timing and provenance details recorded alongside a fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchMetadata {
    /// Every URL visited, in order, when redirects were followed.
    pub redirect_chain: Vec<String>,
    pub content_length: Option<u64>,
    /// Which Shopify product-JSON endpoint succeeded, if any
    /// (`"view-json"` or `"dot-json"`).
    pub shopify_probe: Option<String>,
    /// Console/page errors captured on the rendered path.
    pub console_errors: Vec<String>,
    pub http_elapsed_ms: Option<u64>,
    pub render_elapsed_ms: Option<u64>,
}

/// Raw page material plus provenance for one fetch attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    pub success: bool,
    pub mode: FetchMode,
    pub original_url: String,
    /// Post-redirect URL when it differs from `original_url`.
    pub final_url: Option<String>,
    pub status_code: Option<u16>,
    /// Body from the plain HTTP path.
    pub raw_html: Option<String>,
    /// Body from the headless-browser path.
    pub rendered_html: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub metadata: FetchMetadata,
    pub error: Option<String>,
}

impl FetchResult {
    /// A failed result carrying only a diagnostic string.
    #[must_use]
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            mode: FetchMode::Failed,
            original_url: url.into(),
            final_url: None,
            status_code: None,
            raw_html: None,
            rendered_html: None,
            fetched_at: Utc::now(),
            metadata: FetchMetadata::default(),
            error: Some(error.into()),
        }
    }

    /// The HTML to extract from: the raw body when present, otherwise the
    /// rendered body.
    #[must_use]
    pub fn html(&self) -> Option<&str> {
        self.raw_html
            .as_deref()
            .or(self.rendered_html.as_deref())
    }
}
