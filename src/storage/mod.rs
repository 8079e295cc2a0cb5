//! Storage module for persisting listing state
//!
//! This module handles all database operations for the tracker, including:
//! - SQLite database initialization and schema management
//! - Per-partition listing state (active / inactive)
//! - Atomic application of reconciliation plans
//! - Sweep run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::model::CrawlTarget;
use crate::TrackerError;

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(TrackerError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, TrackerError> {
    SqliteStorage::new(path)
}

/// Active/inactive listing counts of one partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionCounts {
    pub target: CrawlTarget,
    pub active: u64,
    pub inactive: u64,
}

/// Represents a sweep run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a sweep run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            _ => None,
        }
    }
}
