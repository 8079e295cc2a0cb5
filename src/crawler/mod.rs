//! Crawler module for listing discovery
//!
//! This module contains the crawl-side logic, including:
//! - HTTP fetching with two-tier retry (transport retries, then backoff)
//! - The paginated crawl that turns a marketplace search into a set of URLs
//! - The coordinator that sweeps every target and reconciles the results

mod coordinator;
mod fetcher;
mod paginator;
mod retry;

pub use coordinator::{Coordinator, SweepSummary, TargetOutcome, TargetReport};
pub use fetcher::{build_http_client, Fetcher};
pub use paginator::{CrawlPhase, CrawlProgress, CrawlResult, PageCrawler};
pub use retry::RetryPolicy;

use crate::adapters::ParseError;
use crate::UrlError;
use thiserror::Error;

/// Failure of a single fetch after the retry budget was spent
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Unexpected page structure at {url}: {source}")]
    Parse { url: String, source: ParseError },
}

impl FetchError {
    pub(crate) fn network(url: &url::Url, error: &reqwest::Error) -> Self {
        let message = if error.is_redirect() {
            "Too many redirects".to_string()
        } else if error.is_timeout() {
            "Request timeout".to_string()
        } else if error.is_connect() {
            format!("Connection failed: {}", error)
        } else {
            error.to_string()
        };

        Self::Network {
            url: url.to_string(),
            message,
        }
    }

    /// Whether another attempt could succeed
    ///
    /// Network failures, rate limiting and server errors are transient. Other
    /// statuses and pages of the wrong shape fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Status { status, .. } => matches!(status, 408 | 429 | 500..=599),
            Self::Parse { .. } => false,
        }
    }
}

/// Why a marketplace crawl produced no result
///
/// A failed crawl never yields a partial URL set: an interrupted page
/// sequence cannot be trusted for counting.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Could not discover the offer count at {url}: {source}")]
    Discovery { url: String, source: ParseError },

    #[error(transparent)]
    Network(FetchError),

    #[error("Unexpected page structure at {url}: {source}")]
    Parse { url: String, source: ParseError },

    #[error("Could not build search URL: {0}")]
    Request(#[from] UrlError),

    #[error("Crawl cancelled after {pages_fetched} pages")]
    Cancelled { pages_fetched: u32 },
}

impl From<FetchError> for CrawlError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Parse { url, source } => Self::Parse { url, source },
            other => Self::Network(other),
        }
    }
}
