//! Marketplace site adapters
//!
//! A site adapter translates a crawl target and page number into a search URL
//! and translates a fetched search page into a total offer count and the
//! listing URLs on that page. The paginated crawler only talks to this trait,
//! so supporting a new marketplace means adding an adapter.

mod olx;
mod otodom;

pub use olx::{
    OlxAdapter, DEFAULT_BASE_URL as OLX_BASE_URL, DEFAULT_COUNT_SELECTOR,
    DEFAULT_LISTING_SELECTOR,
};
pub use otodom::{OtodomAdapter, OtodomItem, DEFAULT_BASE_URL as OTODOM_BASE_URL};

use crate::model::CrawlTarget;
use crate::url::ListingUrl;
use crate::UrlResult;
use std::fmt;
use thiserror::Error;
use url::Url;

/// Errors raised when a search page does not have the expected shape
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Expected element not found: {0}")]
    MissingElement(String),

    #[error("Invalid embedded JSON: {0}")]
    InvalidJson(String),

    #[error("Could not read an offer count from '{0}'")]
    InvalidCount(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}

/// Marketplaces with a site adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marketplace {
    Otodom,
    Olx,
}

impl Marketplace {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Otodom => "otodom",
            Self::Olx => "olx",
        }
    }
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Capability set every marketplace provides to the paginated crawler
pub trait SiteAdapter {
    /// Site-specific raw link record
    type Item;

    fn marketplace(&self) -> Marketplace;

    /// Builds the search URL for one page (pages start at 1)
    fn request_url(&self, page: u32, target: &CrawlTarget) -> UrlResult<Url>;

    /// Reads the total number of offers the search reports
    fn total_count(&self, document: &str) -> Result<u64, ParseError>;

    /// Extracts the raw link records of one search page
    fn link_items(&self, document: &str) -> Result<Vec<Self::Item>, ParseError>;

    /// Shapes one raw link record into a normalized listing URL
    fn item_to_url(&self, item: &Self::Item) -> UrlResult<ListingUrl>;

    /// Number of listings a full search page carries
    fn page_size(&self) -> u32;

    /// Hard limit on pages the site serves for a target, if it has one
    fn reachable_pages(&self, _target: &CrawlTarget) -> Option<u32> {
        None
    }

    /// Upper bound on offers a crawl limited to `page_limit` extra pages can see
    fn reachable_offers(&self, target: &CrawlTarget, page_limit: u32) -> u64 {
        let mut pages = page_limit.saturating_add(1);
        if let Some(site_cap) = self.reachable_pages(target) {
            pages = pages.min(site_cap);
        }
        u64::from(pages) * u64::from(self.page_size())
    }

    /// Extracts the listing URLs of one search page
    ///
    /// Records that cannot be shaped into a URL are skipped; a page without the
    /// expected link structure is an error.
    fn page_urls(&self, document: &str) -> Result<Vec<ListingUrl>, ParseError> {
        let items = self.link_items(document)?;
        let mut urls = Vec::with_capacity(items.len());
        for item in &items {
            match self.item_to_url(item) {
                Ok(url) => urls.push(url),
                Err(e) => tracing::warn!("[{}] Skipping listing link: {}", self.marketplace(), e),
            }
        }
        Ok(urls)
    }
}

/// Parses the first number in a text, tolerating thousands separators
///
/// `"Znaleźliśmy ponad 1 234 ogłoszeń"` yields `1234`.
pub(crate) fn parse_offer_count(text: &str) -> Result<u64, ParseError> {
    let start = text
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| ParseError::InvalidCount(text.trim().to_string()))?;

    let mut digits = String::new();
    let mut chars = text[start..].chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else if is_thousands_separator(c)
            && chars.peek().map(|next| next.is_ascii_digit()).unwrap_or(false)
        {
            continue;
        } else {
            break;
        }
    }

    digits
        .parse()
        .map_err(|_| ParseError::InvalidCount(text.trim().to_string()))
}

fn is_thousands_separator(c: char) -> bool {
    matches!(c, ' ' | '\u{a0}' | '\u{202f}')
}

/// Parses a CSS selector, keeping the error message
pub(crate) fn compile_selector(selector: &str) -> Result<scraper::Selector, ParseError> {
    scraper::Selector::parse(selector)
        .map_err(|e| ParseError::InvalidSelector(format!("{}: {:?}", selector, e)))
}
