//! Listing URL handling
//!
//! A `ListingUrl` is the identity of one listing detail page. Two listings are
//! the same listing exactly when their normalized URL strings are equal, so
//! every URL passes through `normalize_listing_url` before it is compared,
//! stored or inserted into a dedup set.

mod normalize;

use crate::UrlResult;
use serde::{Serialize, Serializer};
use std::fmt;

pub use normalize::{absolutize, normalize_listing_url, strip_suffix};

/// Normalized absolute URL of a listing detail page
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListingUrl(String);

impl ListingUrl {
    /// Parses and normalizes a listing URL
    ///
    /// # Examples
    ///
    /// ```
    /// use offer_tracker::url::ListingUrl;
    ///
    /// let url = ListingUrl::parse("https://www.olx.pl/d/oferta/flat-CID3-ID1#gallery").unwrap();
    /// assert_eq!(url.as_str(), "https://www.olx.pl/d/oferta/flat-CID3-ID1");
    /// ```
    pub fn parse(raw: &str) -> UrlResult<Self> {
        let url = normalize_listing_url(raw)?;
        Ok(Self(url.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ListingUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ListingUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for ListingUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
