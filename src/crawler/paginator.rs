//! Paginated crawl of one marketplace search
//!
//! The crawl learns the total offer count from the first page and keeps
//! fetching pages until the deduplicated URL set reaches that count or the
//! page ceiling is passed:
//!
//! ```text
//! Initial --page 1--> Accumulating --count reached--> Completed
//!                          |
//!                          +--page > ceiling-------> CeilingReached
//! ```

use super::fetcher::Fetcher;
use super::{CrawlError, FetchError};
use crate::adapters::{Marketplace, SiteAdapter};
use crate::model::CrawlTarget;
use crate::url::ListingUrl;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Crawl state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    /// Nothing fetched yet
    Initial,
    /// Total known, still below it
    Accumulating,
    /// The URL set reached the advertised total
    Completed,
    /// The page ceiling was passed before the total was reached
    CeilingReached,
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initial => "initial",
            Self::Accumulating => "accumulating",
            Self::Completed => "completed",
            Self::CeilingReached => "ceiling-reached",
        };
        f.write_str(s)
    }
}

/// Snapshot of a running crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlProgress {
    pub phase: CrawlPhase,
    pub page: u32,
    pub saved: u64,
    pub total: Option<u64>,
}

impl Default for CrawlProgress {
    fn default() -> Self {
        Self {
            phase: CrawlPhase::Initial,
            page: 0,
            saved: 0,
            total: None,
        }
    }
}

/// Outcome of a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub marketplace: Marketplace,
    pub urls: HashSet<ListingUrl>,
    /// Offer count advertised on the first page
    pub total_offers: u64,
    pub pages_fetched: u32,
    /// `Completed` or `CeilingReached`
    pub phase: CrawlPhase,
}

impl CrawlResult {
    pub fn is_complete(&self) -> bool {
        self.phase == CrawlPhase::Completed
    }
}

/// Runs paginated crawls through a shared `Fetcher`
#[derive(Debug, Clone)]
pub struct PageCrawler {
    fetcher: Arc<Fetcher>,
    page_limit: u32,
    cancel: CancellationToken,
}

impl PageCrawler {
    /// Creates a new crawler
    ///
    /// # Arguments
    ///
    /// * `fetcher` - The fetcher used for every page
    /// * `page_limit` - Pages past the first one a crawl may fetch
    pub fn new(fetcher: Arc<Fetcher>, page_limit: u32) -> Self {
        Self {
            fetcher,
            page_limit,
            cancel: CancellationToken::new(),
        }
    }

    /// Stops crawls between page fetches once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn page_limit(&self) -> u32 {
        self.page_limit
    }

    /// Crawls every page of a target's search on one marketplace
    pub async fn crawl<A: SiteAdapter>(
        &self,
        adapter: &A,
        target: &CrawlTarget,
    ) -> Result<CrawlResult, CrawlError> {
        let (progress, _) = watch::channel(CrawlProgress::default());
        self.crawl_with_progress(adapter, target, &progress).await
    }

    /// Crawls a target, publishing progress after every page
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlResult)` - The deduplicated URL set, never larger than the
    ///   advertised total
    /// * `Err(CrawlError::Discovery)` - The first page never yielded a count;
    ///   no further page was requested
    /// * `Err(CrawlError)` - Any other failure; no partial set is returned
    pub async fn crawl_with_progress<A: SiteAdapter>(
        &self,
        adapter: &A,
        target: &CrawlTarget,
        progress: &watch::Sender<CrawlProgress>,
    ) -> Result<CrawlResult, CrawlError> {
        let marketplace = adapter.marketplace();
        if self.cancel.is_cancelled() {
            return Err(CrawlError::Cancelled { pages_fetched: 0 });
        }

        let first_url = adapter.request_url(1, target)?;
        let (total, first_page) = self
            .fetcher
            .fetch_with(&first_url, |body| {
                adapter
                    .total_count(body)
                    .map(|total| (total, body.to_owned()))
            })
            .await
            .map_err(|e| match e {
                FetchError::Parse { url, source } => CrawlError::Discovery { url, source },
                other => CrawlError::Network(other),
            })?;

        tracing::info!("[{}] [{}] Found {} offers", marketplace, target, total);

        let reachable = adapter.reachable_offers(target, self.page_limit);
        if total > reachable {
            tracing::warn!(
                "[{}] [{}] Search reports {} offers but at most {} are reachable; the crawl will stop at the page ceiling",
                marketplace,
                target,
                total,
                reachable
            );
        }

        let first_urls = adapter
            .page_urls(&first_page)
            .map_err(|source| CrawlError::Parse {
                url: first_url.to_string(),
                source,
            })?;

        let mut urls = HashSet::new();
        let mut page = 1;
        absorb(&mut urls, first_urls, total);
        let mut phase = next_phase(urls.len() as u64, total, page, self.page_limit);
        publish(progress, phase, page, &urls, total);

        while phase == CrawlPhase::Accumulating {
            if self.cancel.is_cancelled() {
                return Err(CrawlError::Cancelled {
                    pages_fetched: page,
                });
            }

            page += 1;
            let url = adapter.request_url(page, target)?;
            let batch = self
                .fetcher
                .fetch_with(&url, |body| adapter.page_urls(body))
                .await?;

            let added = absorb(&mut urls, batch, total);
            phase = next_phase(urls.len() as u64, total, page, self.page_limit);
            publish(progress, phase, page, &urls, total);

            tracing::debug!(
                "[{}] [{}] Page {}: {} new, {}/{} saved",
                marketplace,
                target,
                page,
                added,
                urls.len(),
                total
            );
        }

        if phase == CrawlPhase::CeilingReached {
            tracing::warn!(
                "[{}] [{}] Page ceiling reached after {} pages with {}/{} offers",
                marketplace,
                target,
                page,
                urls.len(),
                total
            );
        } else {
            tracing::info!(
                "[{}] [{}] Saved {} offers from {} pages",
                marketplace,
                target,
                urls.len(),
                page
            );
        }

        Ok(CrawlResult {
            marketplace,
            urls,
            total_offers: total,
            pages_fetched: page,
            phase,
        })
    }
}

/// Adds a page's URLs to the set, never growing it past `total`
///
/// Returns the number of URLs that were new.
fn absorb(urls: &mut HashSet<ListingUrl>, batch: Vec<ListingUrl>, total: u64) -> usize {
    let mut added = 0;
    for url in batch {
        if urls.len() as u64 >= total {
            break;
        }
        if urls.insert(url) {
            added += 1;
        }
    }
    added
}

fn next_phase(saved: u64, total: u64, page: u32, page_limit: u32) -> CrawlPhase {
    if saved >= total {
        CrawlPhase::Completed
    } else if page > page_limit {
        CrawlPhase::CeilingReached
    } else {
        CrawlPhase::Accumulating
    }
}

fn publish(
    progress: &watch::Sender<CrawlProgress>,
    phase: CrawlPhase,
    page: u32,
    urls: &HashSet<ListingUrl>,
    total: u64,
) {
    progress.send_replace(CrawlProgress {
        phase,
        page,
        saved: urls.len() as u64,
        total: Some(total),
    });
}
