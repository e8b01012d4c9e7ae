//! Shopify storefront detection and the product-JSON endpoint probe.
//!
//! Shopify product pages expose the full product object at `<url>?view=json`
//! and `<url>.json`. When either answers with JSON, the fetcher skips DOM
//! scraping entirely and wraps the payload in a synthetic document that the
//! extractor's embedded-JSON harvest picks up unchanged.

use reqwest::Client;

/// Markers that identify a Shopify storefront from its HTML.
const HTML_MARKERS: &[&str] = &["cdn.shopify.com", "Shopify.theme", "shopify-section"];

/// Which probe endpoint produced a hit.
#[derive(Debug)]
pub(crate) struct ProbeHit {
    /// Synthetic HTML document embedding the product JSON.
    pub document: String,
    /// `"view-json"` or `"dot-json"`, recorded in fetch metadata.
    pub endpoint: &'static str,
}

/// Whether the target looks like a Shopify storefront, judged from the URL
/// and (when the HTTP path produced one) the page body.
pub(crate) fn looks_like_shopify(url: &str, html: Option<&str>) -> bool {
    if url.contains("myshopify.com") {
        return true;
    }
    html.is_some_and(|body| HTML_MARKERS.iter().any(|marker| body.contains(marker)))
}

/// Try the two product-JSON endpoints in order. Returns `None` when neither
/// answers with a JSON object; probe failures are never fatal to the fetch.
pub(crate) async fn probe_product_json(client: &Client, url: &str) -> Option<ProbeHit> {
    for (endpoint, probe_url) in candidate_urls(url) {
        match fetch_json_object(client, &probe_url).await {
            Some(json) => {
                tracing::debug!(url = %probe_url, endpoint, "shopify product-json probe hit");
                return Some(ProbeHit {
                    document: wrap_in_document(&json),
                    endpoint,
                });
            }
            None => {
                tracing::trace!(url = %probe_url, endpoint, "shopify product-json probe miss");
            }
        }
    }
    None
}

/// The `?view=json` and `.json` forms of a product URL, query and fragment
/// stripped for the `.json` variant.
fn candidate_urls(url: &str) -> Vec<(&'static str, String)> {
    let mut candidates = Vec::new();

    if let Ok(mut parsed) = reqwest::Url::parse(url) {
        {
            let mut with_view = parsed.clone();
            with_view.query_pairs_mut().append_pair("view", "json");
            candidates.push(("view-json", with_view.to_string()));
        }
        parsed.set_query(None);
        parsed.set_fragment(None);
        let mut path = parsed.to_string();
        while path.ends_with('/') {
            path.pop();
        }
        candidates.push(("dot-json", format!("{path}.json")));
    }

    candidates
}

async fn fetch_json_object(client: &Client, url: &str) -> Option<serde_json::Value> {
    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .ok()?;

    if !response.status().is_success() {
        return None;
    }

    let body = response.text().await.ok()?;
    let value: serde_json::Value = serde_json::from_str(body.trim()).ok()?;
    value.is_object().then_some(value)
}

/// Embed a product JSON object in a minimal document under the
/// `#product-json` script tag the extractor harvests.
fn wrap_in_document(json: &serde_json::Value) -> String {
    format!(
        "<html><head></head><body><script type=\"application/json\" id=\"product-json\">{json}</script></body></html>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn myshopify_url_is_shopify() {
        assert!(looks_like_shopify(
            "https://test-store.myshopify.com/products/tee",
            None
        ));
    }

    #[test]
    fn html_markers_identify_shopify() {
        let html = r#"<html><body><img src="https://cdn.shopify.com/s/files/a.jpg"></body></html>"#;
        assert!(looks_like_shopify("https://shop.example/products/tee", Some(html)));
    }

    #[test]
    fn plain_page_is_not_shopify() {
        assert!(!looks_like_shopify(
            "https://shop.example/products/tee",
            Some("<html><body>hello</body></html>")
        ));
    }

    #[test]
    fn candidate_urls_cover_both_endpoints() {
        let candidates = candidate_urls("https://shop.example/products/tee?variant=1#top");
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].0, "view-json");
        assert!(candidates[0].1.contains("view=json"));
        assert_eq!(candidates[1].0, "dot-json");
        assert_eq!(candidates[1].1, "https://shop.example/products/tee.json");
    }

    #[test]
    fn wrapped_document_embeds_the_payload() {
        let json = serde_json::json!({"product": {"title": "Tee"}});
        let doc = wrap_in_document(&json);
        assert!(doc.contains(r#"<script type="application/json" id="product-json">"#));
        assert!(doc.contains(r#""title":"Tee""#));
    }
}
