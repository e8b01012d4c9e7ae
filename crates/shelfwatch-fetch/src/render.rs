//! The headless-browser rendering seam.
//!
//! The rest of the fetcher only knows [`PageRenderer`]; the concrete
//! [`ChromeRenderer`] launches a fresh browser per call inside
//! `spawn_blocking` so a hung page cannot stall the async runtime. Browser,
//! tab, and the underlying process are torn down when the `Browser` handle
//! drops, on every exit path; the idle-browser timeout backstops the case
//! where the blocking task outlives its caller.

use std::future::Future;
use std::time::{Duration, Instant};

use headless_chrome::{Browser, LaunchOptions};

use crate::error::FetchError;

/// What a render pass produced.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    /// URL the browser ended on, when navigation moved.
    pub final_url: Option<String>,
    /// Page/console errors observed during the load.
    pub console_errors: Vec<String>,
    pub elapsed_ms: u64,
}

/// Renders a URL to post-JavaScript HTML. Implementations must not leak
/// browser state across calls; every render starts cold.
pub trait PageRenderer: Send + Sync {
    fn render(&self, url: &str) -> impl Future<Output = Result<RenderedPage, FetchError>> + Send;
}

/// Production renderer: one fresh headless Chromium per call.
#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    user_agent: String,
    navigation_timeout: Duration,
}

impl ChromeRenderer {
    #[must_use]
    pub fn new(user_agent: impl Into<String>, navigation_timeout: Duration) -> Self {
        Self {
            user_agent: user_agent.into(),
            navigation_timeout,
        }
    }
}

impl PageRenderer for ChromeRenderer {
    async fn render(&self, url: &str) -> Result<RenderedPage, FetchError> {
        let url = url.to_owned();
        let user_agent = self.user_agent.clone();
        let navigation_timeout = self.navigation_timeout;

        let handle = tokio::task::spawn_blocking(move || {
            render_blocking(&url, &user_agent, navigation_timeout)
        });

        match handle.await {
            Ok(result) => result,
            Err(join_err) => Err(FetchError::RenderJoin(join_err.to_string())),
        }
    }
}

/// Synchronous render body. The `Browser` drop at the end of this function
/// (on success and on every `?` early return) kills the Chromium process.
fn render_blocking(
    url: &str,
    user_agent: &str,
    navigation_timeout: Duration,
) -> Result<RenderedPage, FetchError> {
    let started = Instant::now();

    let options = LaunchOptions::default_builder()
        .headless(true)
        .sandbox(false)
        .idle_browser_timeout(navigation_timeout + Duration::from_secs(5))
        .build()
        .map_err(|e| FetchError::Render(format!("launch options: {e}")))?;

    let browser = Browser::new(options).map_err(|e| FetchError::Render(format!("launch: {e}")))?;
    let tab = browser
        .new_tab()
        .map_err(|e| FetchError::Render(format!("new tab: {e}")))?;

    tab.set_default_timeout(navigation_timeout);
    tab.set_user_agent(user_agent, None, None)
        .map_err(|e| FetchError::Render(format!("set user agent: {e}")))?;

    let mut console_errors = Vec::new();

    tab.navigate_to(url)
        .map_err(|e| FetchError::Render(format!("navigate: {e}")))?;
    if let Err(e) = tab.wait_until_navigated() {
        // Some pages never settle; keep whatever content exists and record
        // the navigation problem rather than discarding the render.
        console_errors.push(format!("navigation wait: {e}"));
    }

    let html = tab
        .get_content()
        .map_err(|e| FetchError::Render(format!("content: {e}")))?;

    if html.len() > crate::MAX_HTML_BYTES {
        return Err(FetchError::TooLarge {
            size: html.len(),
            cap: crate::MAX_HTML_BYTES,
        });
    }

    let final_url = tab.get_url();
    let final_url = (final_url != url).then_some(final_url);

    Ok(RenderedPage {
        html,
        final_url,
        console_errors,
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    })
}
