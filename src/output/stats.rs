//! Statistics generation from the listing database
//!
//! This module provides functionality for extracting and displaying
//! tracker statistics from the storage layer.

use crate::storage::{PartitionCounts, RunRecord, Storage};
use crate::TrackerError;

/// Tracker statistics summary
#[derive(Debug, Clone)]
pub struct TrackerStatistics {
    /// Listing counts per partition
    pub partitions: Vec<PartitionCounts>,

    pub total_active: u64,

    pub total_inactive: u64,

    /// Most recent sweep, if any
    pub latest_run: Option<RunRecord>,
}

impl TrackerStatistics {
    pub fn total(&self) -> u64 {
        self.total_active + self.total_inactive
    }

    /// Duration of the latest run in seconds, if it finished
    pub fn latest_run_duration(&self) -> Option<i64> {
        let run = self.latest_run.as_ref()?;
        let started = run
            .started_at
            .parse::<chrono::DateTime<chrono::Utc>>()
            .ok()?;
        let finished = run
            .finished_at
            .as_ref()?
            .parse::<chrono::DateTime<chrono::Utc>>()
            .ok()?;
        Some((finished - started).num_seconds())
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(TrackerStatistics)` - Successfully loaded statistics
/// * `Err(TrackerError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<TrackerStatistics, TrackerError> {
    let partitions = storage.partition_counts()?;
    let total_active = partitions.iter().map(|p| p.active).sum();
    let total_inactive = partitions.iter().map(|p| p.inactive).sum();
    let latest_run = storage.get_latest_run()?;

    Ok(TrackerStatistics {
        partitions,
        total_active,
        total_inactive,
        latest_run,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &TrackerStatistics) {
    println!("=== Listing Statistics ===\n");

    println!("Overview:");
    println!("  Total listings: {}", stats.total());
    println!("  Active: {}", stats.total_active);
    println!("  Inactive: {}", stats.total_inactive);
    println!();

    if !stats.partitions.is_empty() {
        println!("By Partition:");
        for partition in &stats.partitions {
            println!(
                "  {:<40} {:>6} active {:>6} inactive",
                partition.target.to_string(),
                partition.active,
                partition.inactive
            );
        }
        println!();
    }

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Sweep:");
            println!("  Run: {} ({})", run.id, run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            if let Some(seconds) = stats.latest_run_duration() {
                println!("  Duration: {}s", seconds);
            }
        }
        None => println!("No sweeps recorded yet"),
    }
}
