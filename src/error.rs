//! Error taxonomy for adapter-level failures.
//!
//! Adapters swallow most of these while walking listing pages; the fan-out
//! layer turns whatever escapes into a `by_source` error annotation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Connection failure, timeout, or body read error from the HTTP client.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// No headless renderer is configured, or it could not be reached.
    #[error("renderer unavailable: {0}")]
    RendererUnavailable(String),

    /// The WebDriver endpoint answered but the session misbehaved.
    #[error("render failed: {0}")]
    Render(String),

    /// Feed body was not well-formed XML.
    #[error("feed parse error: {0}")]
    Feed(String),

    /// Every collection path ran and produced nothing.
    #[error("{source_name} request failed: {reason}")]
    Exhausted { source_name: String, reason: String },
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;
