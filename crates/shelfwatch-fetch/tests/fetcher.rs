//! Integration tests for the fetch pipeline.
//!
//! Uses `wiremock` to stand up a local HTTP server for each test so no real
//! network traffic is made. The rendered path is driven through stub
//! renderers; real Chromium is never launched here.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shelfwatch_core::FetchMode;
use shelfwatch_fetch::{FetchConfig, FetchError, Fetcher, PageRenderer, RenderedPage};

// ---------------------------------------------------------------------------
// Stub renderers
// ---------------------------------------------------------------------------

/// Renderer that returns a fixed page and counts invocations.
struct StaticRenderer {
    html: String,
    calls: Arc<AtomicUsize>,
}

impl StaticRenderer {
    fn new(html: &str) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                html: html.to_string(),
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl PageRenderer for StaticRenderer {
    async fn render(&self, _url: &str) -> Result<RenderedPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RenderedPage {
            html: self.html.clone(),
            final_url: None,
            console_errors: Vec::new(),
            elapsed_ms: 1,
        })
    }
}

/// Renderer that always fails, counting invocations.
struct FailingRenderer {
    calls: Arc<AtomicUsize>,
}

impl FailingRenderer {
    fn new() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl PageRenderer for FailingRenderer {
    async fn render(&self, _url: &str) -> Result<RenderedPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(FetchError::Render("browser exploded".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn test_config() -> FetchConfig {
    FetchConfig {
        timeout_secs: 5,
        render_timeout_secs: 5,
        deadline_secs: 15,
        user_agent: "shelfwatch-test/0.1".to_string(),
        disable_rendered_fetch: false,
    }
}

/// A structurally complete page; `extra` lands inside `<body>`.
fn complete_page(extra: &str) -> String {
    format!(
        "<html><head><title>Shop</title></head><body><h1>Test Tee</h1>\
         <p>{}</p>{extra}</body></html>",
        "A perfectly ordinary product description with plenty of text. ".repeat(4)
    )
}

fn json_ld_product_block() -> &'static str {
    r#"<script type="application/ld+json">{"@context":"https://schema.org","@type":"Product","name":"Test Tee"}</script>"#
}

// ---------------------------------------------------------------------------
// HTTP path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn json_ld_page_returns_http_mode_without_rendering() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/tee"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(complete_page(json_ld_product_block())),
        )
        .mount(&server)
        .await;

    let (renderer, calls) = StaticRenderer::new("<html><body>rendered</body></html>");
    let fetcher = Fetcher::with_renderer(test_config(), renderer).expect("fetcher");

    let result = fetcher.fetch(&format!("{}/products/tee", server.uri())).await;

    assert!(result.success, "expected success, got: {:?}", result.error);
    assert_eq!(result.mode, FetchMode::Http);
    assert_eq!(result.status_code, Some(200));
    assert!(result.raw_html.as_deref().unwrap().contains("Test Tee"));
    assert_eq!(calls.load(Ordering::SeqCst), 0, "renderer must not run");
}

#[tokio::test]
async fn plain_page_without_structured_data_is_rendered() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/tee"))
        .respond_with(ResponseTemplate::new(200).set_body_string(complete_page("")))
        .mount(&server)
        .await;

    let (renderer, calls) = StaticRenderer::new("<html><body>hydrated price $29.99</body></html>");
    let fetcher = Fetcher::with_renderer(test_config(), renderer).expect("fetcher");

    let result = fetcher.fetch(&format!("{}/products/tee", server.uri())).await;

    assert!(result.success);
    assert_eq!(result.mode, FetchMode::Rendered);
    assert!(result.raw_html.is_none());
    assert!(result
        .rendered_html
        .as_deref()
        .unwrap()
        .contains("hydrated price"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn render_failure_falls_back_to_validated_http_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/tee"))
        .respond_with(ResponseTemplate::new(200).set_body_string(complete_page("")))
        .mount(&server)
        .await;

    let (renderer, calls) = FailingRenderer::new();
    let fetcher = Fetcher::with_renderer(test_config(), renderer).expect("fetcher");

    let result = fetcher.fetch(&format!("{}/products/tee", server.uri())).await;

    assert!(result.success, "validated http body should survive render failure");
    assert_eq!(result.mode, FetchMode::Http);
    assert!(result.raw_html.is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(
        result
            .metadata
            .console_errors
            .iter()
            .any(|e| e.contains("render fallback failed")),
        "render failure must be recorded: {:?}",
        result.metadata.console_errors
    );
}

#[tokio::test]
async fn disabled_rendering_keeps_http_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/tee"))
        .respond_with(ResponseTemplate::new(200).set_body_string(complete_page("")))
        .mount(&server)
        .await;

    let (renderer, calls) = StaticRenderer::new("<html><body>never</body></html>");
    let config = FetchConfig {
        disable_rendered_fetch: true,
        ..test_config()
    };
    let fetcher = Fetcher::with_renderer(config, renderer).expect("fetcher");

    let result = fetcher.fetch(&format!("{}/products/tee", server.uri())).await;

    assert!(result.success);
    assert_eq!(result.mode, FetchMode::Http);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn redirects_record_the_final_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("Location", format!("{}/new", server.uri())),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(complete_page(json_ld_product_block())),
        )
        .mount(&server)
        .await;

    let (renderer, _calls) = StaticRenderer::new("");
    let fetcher = Fetcher::with_renderer(test_config(), renderer).expect("fetcher");

    let original = format!("{}/old", server.uri());
    let result = fetcher.fetch(&original).await;

    assert!(result.success);
    assert_eq!(result.original_url, original);
    assert_eq!(result.final_url, Some(format!("{}/new", server.uri())));
    assert_eq!(result.metadata.redirect_chain.len(), 2);
}

// ---------------------------------------------------------------------------
// Failure paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn incomplete_body_with_failed_render_joins_both_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/tee"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><head></head></html>"))
        .mount(&server)
        .await;

    let (renderer, calls) = FailingRenderer::new();
    let fetcher = Fetcher::with_renderer(test_config(), renderer).expect("fetcher");

    let result = fetcher.fetch(&format!("{}/products/tee", server.uri())).await;

    assert!(!result.success);
    assert_eq!(result.mode, FetchMode::Failed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let error = result.error.expect("error string");
    assert!(error.contains("incomplete"), "got: {error}");
    assert!(error.contains("browser exploded"), "got: {error}");
}

#[tokio::test]
async fn http_error_status_attempts_render_then_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/tee"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (renderer, calls) = FailingRenderer::new();
    let fetcher = Fetcher::with_renderer(test_config(), renderer).expect("fetcher");

    let result = fetcher.fetch(&format!("{}/products/tee", server.uri())).await;

    assert!(!result.success);
    assert_eq!(calls.load(Ordering::SeqCst), 1, "render fallback must be tried");
    assert!(result.error.expect("error").contains("500"));
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let server = MockServer::start().await;
    let huge = format!(
        "<html><body><p>{}</p></body></html>",
        "x".repeat(shelfwatch_fetch::MAX_HTML_BYTES)
    );
    Mock::given(method("GET"))
        .and(path("/products/tee"))
        .respond_with(ResponseTemplate::new(200).set_body_string(huge))
        .mount(&server)
        .await;

    let (renderer, _calls) = FailingRenderer::new();
    let fetcher = Fetcher::with_renderer(test_config(), renderer).expect("fetcher");

    let result = fetcher.fetch(&format!("{}/products/tee", server.uri())).await;

    assert!(!result.success);
    assert!(result.error.expect("error").contains("too large"));
}

#[tokio::test]
async fn deadline_expiry_reports_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/tee"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(complete_page(""))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let (renderer, _calls) = StaticRenderer::new("");
    let config = FetchConfig {
        deadline_secs: 1,
        ..test_config()
    };
    let fetcher = Fetcher::with_renderer(config, renderer).expect("fetcher");

    let result = fetcher.fetch(&format!("{}/products/tee", server.uri())).await;

    assert!(!result.success);
    assert_eq!(result.mode, FetchMode::Failed);
    assert!(result.error.expect("error").contains("timeout"));
}

#[tokio::test]
async fn network_timeout_is_retried_exactly_once() {
    let server = MockServer::start().await;

    // First request hangs past the client timeout; the retry hits the
    // fallthrough mock and succeeds.
    Mock::given(method("GET"))
        .and(path("/products/tee"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(complete_page(json_ld_product_block()))
                .set_delay(Duration::from_secs(3)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products/tee"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(complete_page(json_ld_product_block())),
        )
        .mount(&server)
        .await;

    let (renderer, _calls) = StaticRenderer::new("");
    let config = FetchConfig {
        timeout_secs: 1,
        ..test_config()
    };
    let fetcher = Fetcher::with_renderer(config, renderer).expect("fetcher");

    let result = fetcher.fetch(&format!("{}/products/tee", server.uri())).await;

    assert!(result.success, "retry should have succeeded: {:?}", result.error);
    assert_eq!(result.mode, FetchMode::Http);
}

// ---------------------------------------------------------------------------
// Shopify probe
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shopify_marker_triggers_product_json_probe() {
    let server = MockServer::start().await;

    let storefront = complete_page(
        r#"<img src="https://cdn.shopify.com/s/files/1/tee.jpg" alt="tee">"#,
    );
    Mock::given(method("GET"))
        .and(path("/products/tee"))
        .and(query_param("view", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "product": {
                "title": "Test Tee",
                "variants": [{"id": 1, "option1": "M", "price": "29.99", "available": true}]
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products/tee"))
        .respond_with(ResponseTemplate::new(200).set_body_string(storefront))
        .mount(&server)
        .await;

    let (renderer, calls) = StaticRenderer::new("");
    let fetcher = Fetcher::with_renderer(test_config(), renderer).expect("fetcher");

    let result = fetcher.fetch(&format!("{}/products/tee", server.uri())).await;

    assert!(result.success);
    assert_eq!(result.mode, FetchMode::Http);
    assert_eq!(result.metadata.shopify_probe.as_deref(), Some("view-json"));
    let body = result.raw_html.expect("synthetic document");
    assert!(body.contains(r#"id="product-json""#));
    assert!(body.contains("Test Tee"));
    assert_eq!(calls.load(Ordering::SeqCst), 0, "probe hit makes rendering moot");
}
