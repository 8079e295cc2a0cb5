/// Offer, estate and target definitions
///
/// A `CrawlTarget` identifies both a crawl job and the persisted partition
/// its reconciliation pass operates on.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pseudo-city that asks the marketplaces for the whole country
pub const NATIONWIDE: &str = "cala-polska";

/// Kind of offer a listing belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferType {
    Rent,
    Sale,
}

impl OfferType {
    /// All offer types in sweep order
    pub const ALL: [OfferType; 2] = [OfferType::Rent, OfferType::Sale];

    /// Converts the offer type to its database string representation
    ///
    /// This is also the path segment both marketplaces use.
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Rent => "wynajem",
            Self::Sale => "sprzedaz",
        }
    }

    /// Parses an offer type from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "wynajem" => Some(Self::Rent),
            "sprzedaz" => Some(Self::Sale),
            _ => None,
        }
    }
}

impl fmt::Display for OfferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// Kind of estate a listing describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstateType {
    Apartment,
    House,
}

impl EstateType {
    /// All estate types in sweep order
    pub const ALL: [EstateType; 2] = [EstateType::Apartment, EstateType::House];

    /// Converts the estate type to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Apartment => "mieszkanie",
            Self::House => "dom",
        }
    }

    /// Parses an estate type from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "mieszkanie" => Some(Self::Apartment),
            "dom" => Some(Self::House),
            _ => None,
        }
    }
}

impl fmt::Display for EstateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// One crawl job and one reconciliation partition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrawlTarget {
    pub city: String,
    pub offer: OfferType,
    pub estate: EstateType,
}

impl CrawlTarget {
    pub fn new(city: impl Into<String>, offer: OfferType, estate: EstateType) -> Self {
        Self {
            city: city.into(),
            offer,
            estate,
        }
    }

    /// Returns true for the whole-country pseudo-city
    pub fn is_nationwide(&self) -> bool {
        self.city == NATIONWIDE
    }

    /// Expands cities, estates and offers into targets
    ///
    /// Order is city-major, then estate, then offer, so one city's targets are
    /// processed together.
    pub fn expand(cities: &[String], estates: &[EstateType], offers: &[OfferType]) -> Vec<Self> {
        let mut targets = Vec::with_capacity(cities.len() * estates.len() * offers.len());
        for city in cities {
            for estate in estates {
                for offer in offers {
                    targets.push(Self::new(city.clone(), *offer, *estate));
                }
            }
        }
        targets
    }
}

impl fmt::Display for CrawlTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.city, self.offer, self.estate)
    }
}
