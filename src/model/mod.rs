//! Domain model for listing discovery
//!
//! # Components
//!
//! - `OfferType` / `EstateType`: the fixed offer and estate enumerations
//! - `CrawlTarget`: one (city, offer, estate) crawl job and reconciliation partition
//! - `ListingRecord`: a persisted listing URL with its active flag

mod listing;
mod target;

pub use listing::ListingRecord;
pub use target::{CrawlTarget, EstateType, OfferType, NATIONWIDE};
