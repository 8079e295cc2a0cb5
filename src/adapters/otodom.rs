//! Otodom adapter
//!
//! Otodom renders search results client-side from a Next.js data island, so
//! both the offer count and the listing slugs come from the JSON embedded in
//! `<script id="__NEXT_DATA__">`.

use crate::adapters::{compile_selector, Marketplace, ParseError, SiteAdapter};
use crate::model::{CrawlTarget, EstateType};
use crate::url::{absolutize, ListingUrl};
use crate::{UrlError, UrlResult};
use scraper::Html;
use serde::Deserialize;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.otodom.pl";

const PAGE_SIZE: u32 = 36;
const NEXT_DATA_SELECTOR: &str = "script#__NEXT_DATA__";
const LISTING_PATH: &str = "/pl/oferta/";

/// Raw search-result record from the data island
#[derive(Debug, Clone, Deserialize)]
pub struct OtodomItem {
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NextData {
    props: NextProps,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NextProps {
    page_props: PageProps,
}

#[derive(Debug, Deserialize)]
struct PageProps {
    data: SearchData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchData {
    search_ads: SearchAds,
}

#[derive(Debug, Deserialize)]
struct SearchAds {
    items: Vec<OtodomItem>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    total_results: Option<u64>,
}

/// Site adapter for otodom.pl
#[derive(Debug, Clone)]
pub struct OtodomAdapter {
    base_url: Url,
}

impl OtodomAdapter {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    fn search_ads(&self, document: &str) -> Result<SearchAds, ParseError> {
        let selector = compile_selector(NEXT_DATA_SELECTOR)?;
        let html = Html::parse_document(document);
        let island = html
            .select(&selector)
            .next()
            .ok_or_else(|| ParseError::MissingElement(NEXT_DATA_SELECTOR.to_string()))?;

        let json = island.text().collect::<String>();
        let data: NextData =
            serde_json::from_str(&json).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
        Ok(data.props.page_props.data.search_ads)
    }
}

impl SiteAdapter for OtodomAdapter {
    type Item = OtodomItem;

    fn marketplace(&self) -> Marketplace {
        Marketplace::Otodom
    }

    fn request_url(&self, page: u32, target: &CrawlTarget) -> UrlResult<Url> {
        let estate = match target.estate {
            EstateType::Apartment => "mieszkanie",
            EstateType::House => "dom",
        };

        // The nationwide pseudo-city uses the same path shape; see reachable_offers.
        let mut url = absolutize(
            &self.base_url,
            &format!("/pl/oferty/{}/{}/{}", target.offer, estate, target.city),
        )?;
        url.query_pairs_mut()
            .append_pair("distanceRadius", "0")
            .append_pair("page", &page.to_string())
            .append_pair("limit", &PAGE_SIZE.to_string())
            .append_pair("by", "DEFAULT")
            .append_pair("direction", "DESC")
            .append_pair("viewType", "listing");
        Ok(url)
    }

    fn total_count(&self, document: &str) -> Result<u64, ParseError> {
        self.search_ads(document)?
            .pagination
            .and_then(|p| p.total_results)
            .ok_or_else(|| ParseError::MissingElement("searchAds.pagination.totalResults".into()))
    }

    fn link_items(&self, document: &str) -> Result<Vec<OtodomItem>, ParseError> {
        Ok(self.search_ads(document)?.items)
    }

    fn item_to_url(&self, item: &OtodomItem) -> UrlResult<ListingUrl> {
        let slug = item
            .slug
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| UrlError::Parse("search result without slug".to_string()))?;

        let url = absolutize(&self.base_url, &format!("{}{}", LISTING_PATH, slug))?;
        ListingUrl::parse(url.as_str())
    }

    fn page_size(&self) -> u32 {
        PAGE_SIZE
    }
}
