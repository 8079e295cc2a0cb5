//! Output module for statistics and exports
//!
//! This module handles:
//! - Summarizing stored listing state per partition
//! - Exporting listings as JSON for downstream detail scrapers

mod export;
pub mod stats;

pub use export::{export_listings, listings_to_json};
pub use stats::{load_statistics, print_statistics, TrackerStatistics};
