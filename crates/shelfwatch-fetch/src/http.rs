//! The plain HTTP fetch path: browser-like headers, bounded redirects, a
//! single retry on network timeout, and structural validation of the body.

use std::time::Instant;

use regex::Regex;
use reqwest::Client;

use crate::error::FetchError;
use crate::MAX_HTML_BYTES;

/// Minimum visible body content (scripts/styles/tags stripped) for a page to
/// count as complete.
const MIN_BODY_CHARS: usize = 100;

/// Outcome of a successful, validated-status HTTP GET. The body has passed
/// the size cap but NOT yet the structural validation; callers decide
/// whether an invalid body routes to the rendered fallback.
#[derive(Debug)]
pub(crate) struct HttpFetch {
    pub body: String,
    pub status: u16,
    pub final_url: String,
    pub elapsed_ms: u64,
}

/// GET `url` with the configured client, retrying exactly once and only when
/// the first attempt failed on a network timeout. HTTP error statuses are
/// never retried.
pub(crate) async fn get_with_single_retry(client: &Client, url: &str) -> Result<HttpFetch, FetchError> {
    match get_once(client, url).await {
        Ok(fetch) => Ok(fetch),
        Err(FetchError::Http(e)) if e.is_timeout() => {
            tracing::debug!(url, "http fetch timed out; retrying once");
            get_once(client, url).await
        }
        Err(e) => Err(e),
    }
}

async fn get_once(client: &Client, url: &str) -> Result<HttpFetch, FetchError> {
    let started = Instant::now();

    let response = client
        .get(url)
        .header(
            reqwest::header::ACCEPT,
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        )
        .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
        .header(reqwest::header::CACHE_CONTROL, "no-cache")
        .header("Upgrade-Insecure-Requests", "1")
        .send()
        .await?;

    let status = response.status();
    let final_url = response.url().to_string();

    if !status.is_success() {
        return Err(FetchError::UnexpectedStatus {
            status: status.as_u16(),
            url: final_url,
        });
    }

    if let Some(len) = response.content_length() {
        if len as usize > MAX_HTML_BYTES {
            return Err(FetchError::TooLarge {
                size: len as usize,
                cap: MAX_HTML_BYTES,
            });
        }
    }

    let body = response.text().await?;
    if body.len() > MAX_HTML_BYTES {
        return Err(FetchError::TooLarge {
            size: body.len(),
            cap: MAX_HTML_BYTES,
        });
    }

    Ok(HttpFetch {
        body,
        status: status.as_u16(),
        final_url,
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    })
}

/// Structural completeness check: the document must carry `<html>` and
/// `<body>` tags and at least [`MIN_BODY_CHARS`] of visible text once
/// scripts, styles, and markup are stripped.
pub(crate) fn validate_html(body: &str) -> Result<(), FetchError> {
    if body.len() > MAX_HTML_BYTES {
        return Err(FetchError::TooLarge {
            size: body.len(),
            cap: MAX_HTML_BYTES,
        });
    }

    let lower = body.to_lowercase();
    if !lower.contains("<html") {
        return Err(FetchError::IncompleteHtml("missing <html> tag"));
    }
    if !lower.contains("<body") {
        return Err(FetchError::IncompleteHtml("missing <body> tag"));
    }

    if visible_text_len(body) < MIN_BODY_CHARS {
        return Err(FetchError::IncompleteHtml("body content under 100 chars"));
    }

    Ok(())
}

/// Length of the body's visible text with script/style blocks and all tags
/// removed and whitespace collapsed.
fn visible_text_len(body: &str) -> usize {
    let scripts =
        Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("valid script-strip regex");
    let styles = Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("valid style-strip regex");
    let tags = Regex::new(r"(?is)<[^>]+>").expect("valid tag-strip regex");

    let no_scripts = scripts.replace_all(body, " ");
    let no_styles = styles.replace_all(&no_scripts, " ");
    let no_tags = tags.replace_all(&no_styles, " ");

    no_tags.split_whitespace().collect::<Vec<_>>().join(" ").len()
}
