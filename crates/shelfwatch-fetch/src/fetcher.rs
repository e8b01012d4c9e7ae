//! Fetch orchestration: HTTP first, Shopify probe when the storefront looks
//! like one, rendered fallback when the plain body is incomplete or carries
//! no structured product data, all under one hard deadline.

use std::time::Duration;

use chrono::Utc;
use regex::Regex;
use reqwest::redirect;
use reqwest::Client;

use shelfwatch_core::{AppConfig, FetchMetadata, FetchMode, FetchResult};

use crate::error::FetchError;
use crate::http::{get_with_single_retry, validate_html, HttpFetch};
use crate::render::{ChromeRenderer, PageRenderer, RenderedPage};
use crate::shopify;

/// Fetcher knobs, usually lifted straight off [`AppConfig`].
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub render_timeout_secs: u64,
    pub deadline_secs: u64,
    pub user_agent: String,
    pub disable_rendered_fetch: bool,
}

impl FetchConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.fetch_timeout_secs,
            render_timeout_secs: config.render_timeout_secs,
            deadline_secs: config.fetch_deadline_secs,
            user_agent: config.fetch_user_agent.clone(),
            disable_rendered_fetch: config.disable_rendered_fetch,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            render_timeout_secs: 15,
            deadline_secs: 20,
            user_agent: shelfwatch_core::config::DEFAULT_USER_AGENT.to_string(),
            disable_rendered_fetch: false,
        }
    }
}

/// Fetches product pages. One instance is shared across all checks; the
/// renderer launches a fresh browser per call so no page state crosses
/// between fetches.
pub struct Fetcher<R = ChromeRenderer> {
    client: Client,
    renderer: R,
    config: FetchConfig,
}

impl Fetcher<ChromeRenderer> {
    /// Build a production fetcher with the headless-Chromium renderer.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let renderer = ChromeRenderer::new(
            config.user_agent.clone(),
            Duration::from_secs(config.render_timeout_secs),
        );
        Self::with_renderer(config, renderer)
    }
}

impl<R: PageRenderer> Fetcher<R> {
    /// Build a fetcher with a custom renderer (tests, alternate browsers).
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn with_renderer(config: FetchConfig, renderer: R) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .redirect(redirect::Policy::limited(10))
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            renderer,
            config,
        })
    }

    /// Fetch a product page. Never returns an error: every failure mode is
    /// folded into `FetchResult { success: false }` with a diagnostic
    /// string. The whole call is bounded by the configured hard deadline.
    pub async fn fetch(&self, url: &str) -> FetchResult {
        let deadline = Duration::from_secs(self.config.deadline_secs);
        match tokio::time::timeout(deadline, self.fetch_inner(url)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    url,
                    deadline_secs = self.config.deadline_secs,
                    "fetch deadline exceeded; abandoning in-flight path"
                );
                FetchResult::failed(
                    url,
                    format!(
                        "fetch deadline of {}s exceeded (timeout)",
                        self.config.deadline_secs
                    ),
                )
            }
        }
    }

    async fn fetch_inner(&self, url: &str) -> FetchResult {
        let fetched_at = Utc::now();
        let mut metadata = FetchMetadata {
            redirect_chain: vec![url.to_string()],
            ..FetchMetadata::default()
        };

        let (http_fetch, http_error) = match get_with_single_retry(&self.client, url).await {
            Ok(fetch) => (Some(fetch), None),
            Err(e) => {
                tracing::debug!(url, error = %e, "http fetch path failed");
                (None, Some(e.to_string()))
            }
        };

        if let Some(fetch) = &http_fetch {
            if fetch.final_url != url {
                metadata.redirect_chain.push(fetch.final_url.clone());
            }
            metadata.content_length = Some(fetch.body.len() as u64);
            metadata.http_elapsed_ms = Some(fetch.elapsed_ms);
        }

        // Shopify storefronts answer with full product JSON; when that works
        // there is nothing rendering could add.
        if shopify::looks_like_shopify(url, http_fetch.as_ref().map(|f| f.body.as_str())) {
            if let Some(hit) = shopify::probe_product_json(&self.client, url).await {
                metadata.shopify_probe = Some(hit.endpoint.to_string());
                return http_result(url, fetched_at, metadata, http_fetch.as_ref(), hit.document);
            }
        }

        let Some(fetch) = http_fetch else {
            // Plain HTTP never produced a body; the rendered path is the
            // only remaining option.
            return match self.render(url).await {
                Ok(page) => rendered_result(url, fetched_at, metadata, None, page),
                Err(render_err) => {
                    let http_err = http_error.unwrap_or_else(|| "http path failed".to_string());
                    failed_with_metadata(
                        url,
                        fetched_at,
                        metadata,
                        format!("http: {http_err}; render: {render_err}"),
                    )
                }
            };
        };

        match validate_html(&fetch.body) {
            Ok(()) => {
                if has_json_ld_product(&fetch.body) {
                    // Structured data already present; rendering adds nothing.
                    let body = fetch.body.clone();
                    return http_result(url, fetched_at, metadata, Some(&fetch), body);
                }
                match self.render(url).await {
                    Ok(page) => rendered_result(url, fetched_at, metadata, Some(&fetch), page),
                    Err(render_err) => {
                        // The validated static body is still usable.
                        tracing::debug!(url, error = %render_err, "render fallback failed; keeping http body");
                        metadata
                            .console_errors
                            .push(format!("render fallback failed: {render_err}"));
                        let body = fetch.body.clone();
                        http_result(url, fetched_at, metadata, Some(&fetch), body)
                    }
                }
            }
            Err(validation_err) => match self.render(url).await {
                Ok(page) => rendered_result(url, fetched_at, metadata, Some(&fetch), page),
                Err(render_err) => failed_with_metadata(
                    url,
                    fetched_at,
                    metadata,
                    format!("http: {validation_err}; render: {render_err}"),
                ),
            },
        }
    }

    async fn render(&self, url: &str) -> Result<RenderedPage, FetchError> {
        if self.config.disable_rendered_fetch {
            return Err(FetchError::RenderDisabled);
        }
        self.renderer.render(url).await
    }

}

fn http_result(
    url: &str,
    fetched_at: chrono::DateTime<Utc>,
    metadata: FetchMetadata,
    http_fetch: Option<&HttpFetch>,
    body: String,
) -> FetchResult {
    FetchResult {
        success: true,
        mode: FetchMode::Http,
        original_url: url.to_string(),
        final_url: http_fetch.and_then(|f| (f.final_url != url).then(|| f.final_url.clone())),
        status_code: http_fetch.map(|f| f.status),
        raw_html: Some(body),
        rendered_html: None,
        fetched_at,
        metadata,
        error: None,
    }
}

fn rendered_result(
    url: &str,
    fetched_at: chrono::DateTime<Utc>,
    mut metadata: FetchMetadata,
    http_fetch: Option<&HttpFetch>,
    page: RenderedPage,
) -> FetchResult {
    metadata.render_elapsed_ms = Some(page.elapsed_ms);
    metadata.console_errors.extend(page.console_errors);
    let final_url = page
        .final_url
        .or_else(|| http_fetch.and_then(|f| (f.final_url != url).then(|| f.final_url.clone())));

    FetchResult {
        success: true,
        mode: FetchMode::Rendered,
        original_url: url.to_string(),
        final_url,
        status_code: http_fetch.map(|f| f.status),
        raw_html: None,
        rendered_html: Some(page.html),
        fetched_at,
        metadata,
        error: None,
    }
}

fn failed_with_metadata(
    url: &str,
    fetched_at: chrono::DateTime<Utc>,
    metadata: FetchMetadata,
    error: String,
) -> FetchResult {
    FetchResult {
        success: false,
        mode: FetchMode::Failed,
        original_url: url.to_string(),
        final_url: None,
        status_code: None,
        raw_html: None,
        rendered_html: None,
        fetched_at,
        metadata,
        error: Some(error),
    }
}

/// Whether the body carries a JSON-LD block whose `@type` includes `Product`
/// (directly, in an array, or inside an `@graph`).
fn has_json_ld_product(body: &str) -> bool {
    let script_re = Regex::new(
        r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#,
    )
    .expect("valid json-ld script regex");

    for cap in script_re.captures_iter(body) {
        let raw = cap.get(1).map_or("", |m| m.as_str()).trim();
        if raw.is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
            continue;
        };
        if value_is_product(&value) {
            return true;
        }
    }
    false
}

fn value_is_product(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Object(map) => {
            let type_is_product = match map.get("@type") {
                Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case("product"),
                Some(serde_json::Value::Array(items)) => items
                    .iter()
                    .filter_map(serde_json::Value::as_str)
                    .any(|s| s.eq_ignore_ascii_case("product")),
                _ => false,
            };
            if type_is_product {
                return true;
            }
            map.get("@graph")
                .and_then(serde_json::Value::as_array)
                .is_some_and(|graph| graph.iter().any(value_is_product))
        }
        serde_json::Value::Array(items) => items.iter().any(value_is_product),
        _ => false,
    }
}
