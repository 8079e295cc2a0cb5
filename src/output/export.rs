//! JSON export of stored listings

use crate::model::ListingRecord;
use crate::storage::Storage;
use crate::TrackerError;
use std::fs;
use std::path::Path;

/// Serializes listings as a pretty-printed JSON array
pub fn listings_to_json(records: &[ListingRecord]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}

/// Writes stored listings to a JSON file
///
/// # Arguments
///
/// * `storage` - The storage backend to read from
/// * `path` - Destination file, overwritten if it exists
/// * `active_only` - Export only listings currently believed live
///
/// # Returns
///
/// The number of exported listings
pub fn export_listings(
    storage: &dyn Storage,
    path: &Path,
    active_only: bool,
) -> Result<usize, TrackerError> {
    let records = storage.load_listings(active_only)?;
    let json = listings_to_json(&records)?;
    fs::write(path, json)?;

    tracing::info!("Exported {} listings to {}", records.len(), path.display());
    Ok(records.len())
}
