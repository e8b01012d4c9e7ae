use thiserror::Error;

/// Internal fetch failure taxonomy. At the crate boundary these collapse
/// into `FetchResult { success: false, error }` strings; callers never see
/// this enum unless they are inside the fetcher itself.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("response too large: {size} bytes exceeds {cap} byte cap")]
    TooLarge { size: usize, cap: usize },

    #[error("structurally incomplete HTML: {0}")]
    IncompleteHtml(&'static str),

    #[error("render failed: {0}")]
    Render(String),

    #[error("render task aborted: {0}")]
    RenderJoin(String),

    #[error("rendered fetch disabled by configuration")]
    RenderDisabled,
}
