//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::model::{CrawlTarget, ListingRecord};
use crate::reconcile::ReconcilePlan;
use crate::storage::{PartitionCounts, RunRecord, RunStatus};
use crate::url::ListingUrl;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Listing operations are scoped to one partition (city, offer, estate); the
/// same URL may live in several partitions independently.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new sweep run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Sets the final status of a run together with a finish timestamp
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&mut self, run_id: i64) -> StorageResult<()> {
        self.finish_run(run_id, RunStatus::Completed)
    }

    // ===== Listing State =====

    /// Loads the active listings of a partition
    fn load_active(&self, target: &CrawlTarget) -> StorageResult<Vec<ListingRecord>>;

    /// Loads the inactive listings of a partition
    fn load_inactive(&self, target: &CrawlTarget) -> StorageResult<Vec<ListingRecord>>;

    /// Inserts listings, leaving already stored ones untouched
    ///
    /// # Returns
    ///
    /// The number of rows actually inserted
    fn insert(&mut self, records: &[ListingRecord]) -> StorageResult<usize>;

    /// Marks a listing of a partition as active
    fn set_active(&mut self, target: &CrawlTarget, url: &ListingUrl) -> StorageResult<()>;

    /// Marks a listing of a partition as inactive
    fn set_inactive(&mut self, target: &CrawlTarget, url: &ListingUrl) -> StorageResult<()>;

    /// Applies a reconciliation plan to a partition in one transaction
    fn apply_plan(&mut self, target: &CrawlTarget, plan: &ReconcilePlan) -> StorageResult<()>;

    // ===== Statistics & Export =====

    /// Counts active and inactive listings per partition
    fn partition_counts(&self) -> StorageResult<Vec<PartitionCounts>>;

    /// Loads every stored listing, optionally only the active ones
    fn load_listings(&self, active_only: bool) -> StorageResult<Vec<ListingRecord>>;
}
