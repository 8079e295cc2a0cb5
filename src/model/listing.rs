use crate::model::{CrawlTarget, EstateType, OfferType};
use crate::url::ListingUrl;
use serde::Serialize;

/// A persisted listing URL within one crawl partition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ListingRecord {
    pub url: ListingUrl,
    pub city: String,
    pub offer: OfferType,
    pub estate: EstateType,
    pub is_active: bool,
    /// Set by downstream detail scrapers once the listing was consumed
    pub used: bool,
}

impl ListingRecord {
    /// Creates a freshly discovered, active and unused record
    pub fn discovered(url: ListingUrl, target: &CrawlTarget) -> Self {
        Self {
            url,
            city: target.city.clone(),
            offer: target.offer,
            estate: target.estate,
            is_active: true,
            used: false,
        }
    }

    /// Returns true if the record lives in the given partition
    pub fn belongs_to(&self, target: &CrawlTarget) -> bool {
        self.city == target.city && self.offer == target.offer && self.estate == target.estate
    }

    pub fn target(&self) -> CrawlTarget {
        CrawlTarget::new(self.city.clone(), self.offer, self.estate)
    }
}
