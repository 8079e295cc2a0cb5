//! OLX adapter
//!
//! OLX serves server-rendered HTML: the offer count is the text of a heading
//! and listings are plain anchors. Its own listings use site-relative `/d/`
//! paths, while listings cross-posted from Otodom are absolute `.html` URLs.

use crate::adapters::{compile_selector, parse_offer_count, Marketplace, ParseError, SiteAdapter};
use crate::model::{CrawlTarget, EstateType};
use crate::url::{absolutize, strip_suffix, ListingUrl};
use crate::UrlResult;
use scraper::{Html, Selector};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.olx.pl";
pub const DEFAULT_COUNT_SELECTOR: &str = "h3.css-1y5481k";
pub const DEFAULT_LISTING_SELECTOR: &str = "a.css-rc5s2u";

const PAGE_SIZE: u32 = 40;

/// OLX stops serving results after this page for the nationwide search
const NATIONWIDE_PAGE_CAP: u32 = 25;

const OWN_LISTING_PREFIX: &str = "/d/";

/// Site adapter for olx.pl
#[derive(Debug, Clone)]
pub struct OlxAdapter {
    base_url: Url,
    count_selector: Selector,
    listing_selector: Selector,
}

impl OlxAdapter {
    pub fn new(
        base_url: Url,
        count_selector: &str,
        listing_selector: &str,
    ) -> Result<Self, ParseError> {
        Ok(Self {
            base_url,
            count_selector: compile_selector(count_selector)?,
            listing_selector: compile_selector(listing_selector)?,
        })
    }
}

impl SiteAdapter for OlxAdapter {
    type Item = String;

    fn marketplace(&self) -> Marketplace {
        Marketplace::Olx
    }

    fn request_url(&self, page: u32, target: &CrawlTarget) -> UrlResult<Url> {
        let estate = match target.estate {
            EstateType::Apartment => "mieszkania",
            EstateType::House => "domy",
        };

        let mut url = absolutize(
            &self.base_url,
            &format!("/nieruchomosci/{}/{}/{}/", estate, target.offer, target.city),
        )?;
        url.query_pairs_mut().append_pair("page", &page.to_string());
        Ok(url)
    }

    fn total_count(&self, document: &str) -> Result<u64, ParseError> {
        let html = Html::parse_document(document);
        let heading = html
            .select(&self.count_selector)
            .next()
            .ok_or_else(|| ParseError::MissingElement("offer count heading".to_string()))?;

        parse_offer_count(&heading.text().collect::<String>())
    }

    fn link_items(&self, document: &str) -> Result<Vec<String>, ParseError> {
        let html = Html::parse_document(document);
        Ok(html
            .select(&self.listing_selector)
            .filter_map(|anchor| anchor.value().attr("href"))
            .map(|href| href.trim().to_string())
            .filter(|href| !href.is_empty())
            .collect())
    }

    fn item_to_url(&self, href: &String) -> UrlResult<ListingUrl> {
        if href.starts_with(OWN_LISTING_PREFIX) {
            let url = absolutize(&self.base_url, href)?;
            ListingUrl::parse(url.as_str())
        } else {
            ListingUrl::parse(&strip_suffix(href, ".html"))
        }
    }

    fn page_size(&self) -> u32 {
        PAGE_SIZE
    }

    fn reachable_pages(&self, target: &CrawlTarget) -> Option<u32> {
        target.is_nationwide().then_some(NATIONWIDE_PAGE_CAP)
    }
}
