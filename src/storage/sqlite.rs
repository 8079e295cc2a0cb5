//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::model::{CrawlTarget, EstateType, ListingRecord, OfferType};
use crate::reconcile::ReconcilePlan;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{PartitionCounts, RunRecord, RunStatus};
use crate::url::ListingUrl;
use crate::TrackerError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const LISTING_COLUMNS: &str = "url, city_name, type_of_offer, type_of_estate, is_active, used";

const INSERT_LISTING_SQL: &str = "INSERT INTO listings
    (url, city_name, type_of_offer, type_of_estate, is_active, used, discovered_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
    ON CONFLICT(url, city_name, type_of_offer, type_of_estate) DO NOTHING";

const SET_ACTIVE_SQL: &str = "UPDATE listings SET is_active = ?1, updated_at = ?2
    WHERE url = ?3 AND city_name = ?4 AND type_of_offer = ?5 AND type_of_estate = ?6";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(TrackerError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, TrackerError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (dry runs and tests)
    pub fn new_in_memory() -> Result<Self, TrackerError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn load_partition(&self, target: &CrawlTarget, active: bool) -> StorageResult<Vec<ListingRecord>> {
        let sql = format!(
            "SELECT {} FROM listings
             WHERE city_name = ?1 AND type_of_offer = ?2 AND type_of_estate = ?3 AND is_active = ?4
             ORDER BY id",
            LISTING_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![
                    target.city,
                    target.offer.to_db_string(),
                    target.estate.to_db_string(),
                    active
                ],
                ListingRow::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(into_records(rows))
    }

    fn set_flag(&mut self, target: &CrawlTarget, url: &ListingUrl, active: bool) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            SET_ACTIVE_SQL,
            params![
                active,
                now,
                url.as_str(),
                target.city,
                target.offer.to_db_string(),
                target.estate.to_db_string()
            ],
        )?;
        Ok(())
    }
}

/// Raw listing row before its columns are validated
struct ListingRow {
    url: String,
    city: String,
    offer: String,
    estate: String,
    is_active: bool,
    used: bool,
}

impl ListingRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            url: row.get(0)?,
            city: row.get(1)?,
            offer: row.get(2)?,
            estate: row.get(3)?,
            is_active: row.get(4)?,
            used: row.get(5)?,
        })
    }

    fn into_record(self) -> StorageResult<ListingRecord> {
        let url = ListingUrl::parse(&self.url)
            .map_err(|e| StorageError::Serialization(format!("{}: {}", self.url, e)))?;
        let offer = OfferType::from_db_string(&self.offer)
            .ok_or_else(|| StorageError::Serialization(format!("Unknown offer type '{}'", self.offer)))?;
        let estate = EstateType::from_db_string(&self.estate).ok_or_else(|| {
            StorageError::Serialization(format!("Unknown estate type '{}'", self.estate))
        })?;

        Ok(ListingRecord {
            url,
            city: self.city,
            offer,
            estate,
            is_active: self.is_active,
            used: self.used,
        })
    }
}

/// Converts rows, skipping the ones that do not describe a valid listing
fn into_records(rows: Vec<ListingRow>) -> Vec<ListingRecord> {
    rows.into_iter()
        .filter_map(|row| match row.into_record() {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping stored listing: {}", e);
                None
            }
        })
        .collect()
}

/// Raw `runs` row before the status string is checked
struct RunRow {
    id: i64,
    started_at: String,
    finished_at: Option<String>,
    config_hash: String,
    status: String,
}

impl RunRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            config_hash: row.get(3)?,
            status: row.get(4)?,
        })
    }

    fn into_record(self) -> StorageResult<RunRecord> {
        let status = RunStatus::from_db_string(&self.status).ok_or_else(|| {
            StorageError::Serialization(format!("Unknown run status '{}'", self.status))
        })?;

        Ok(RunRecord {
            id: self.id,
            started_at: self.started_at,
            finished_at: self.finished_at,
            config_hash: self.config_hash,
            status,
        })
    }
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                RunRow::from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))?
            .into_record()
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                RunRow::from_row,
            )
            .optional()?
            .map(RunRow::into_record)
            .transpose()
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        Ok(())
    }

    // ===== Listing State =====

    fn load_active(&self, target: &CrawlTarget) -> StorageResult<Vec<ListingRecord>> {
        self.load_partition(target, true)
    }

    fn load_inactive(&self, target: &CrawlTarget) -> StorageResult<Vec<ListingRecord>> {
        self.load_partition(target, false)
    }

    fn insert(&mut self, records: &[ListingRecord]) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare_cached(INSERT_LISTING_SQL)?;
            for record in records {
                inserted += stmt.execute(params![
                    record.url.as_str(),
                    record.city,
                    record.offer.to_db_string(),
                    record.estate.to_db_string(),
                    record.is_active,
                    record.used,
                    now
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn set_active(&mut self, target: &CrawlTarget, url: &ListingUrl) -> StorageResult<()> {
        self.set_flag(target, url, true)
    }

    fn set_inactive(&mut self, target: &CrawlTarget, url: &ListingUrl) -> StorageResult<()> {
        self.set_flag(target, url, false)
    }

    fn apply_plan(&mut self, target: &CrawlTarget, plan: &ReconcilePlan) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let offer = target.offer.to_db_string();
        let estate = target.estate.to_db_string();

        let tx = self.conn.transaction()?;
        {
            let mut insert = tx.prepare_cached(INSERT_LISTING_SQL)?;
            for url in &plan.to_insert {
                insert.execute(params![url.as_str(), target.city, offer, estate, true, false, now])?;
            }

            let mut flag = tx.prepare_cached(SET_ACTIVE_SQL)?;
            for url in &plan.to_reactivate {
                flag.execute(params![true, now, url.as_str(), target.city, offer, estate])?;
            }
            for url in &plan.to_deactivate {
                flag.execute(params![false, now, url.as_str(), target.city, offer, estate])?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    // ===== Statistics & Export =====

    fn partition_counts(&self) -> StorageResult<Vec<PartitionCounts>> {
        let mut stmt = self.conn.prepare(
            "SELECT city_name, type_of_offer, type_of_estate,
                    SUM(CASE WHEN is_active THEN 1 ELSE 0 END),
                    SUM(CASE WHEN is_active THEN 0 ELSE 1 END)
             FROM listings
             GROUP BY city_name, type_of_offer, type_of_estate
             ORDER BY city_name, type_of_estate, type_of_offer",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut counts = Vec::with_capacity(rows.len());
        for (city, offer, estate, active, inactive) in rows {
            let (Some(offer), Some(estate)) = (
                OfferType::from_db_string(&offer),
                EstateType::from_db_string(&estate),
            ) else {
                tracing::warn!("Skipping unknown partition {}/{}/{}", city, offer, estate);
                continue;
            };
            counts.push(PartitionCounts {
                target: CrawlTarget::new(city, offer, estate),
                active: active as u64,
                inactive: inactive as u64,
            });
        }

        Ok(counts)
    }

    fn load_listings(&self, active_only: bool) -> StorageResult<Vec<ListingRecord>> {
        let filter = if active_only { "WHERE is_active = 1" } else { "" };
        let sql = format!(
            "SELECT {} FROM listings {} ORDER BY city_name, type_of_estate, type_of_offer, id",
            LISTING_COLUMNS, filter
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], ListingRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(into_records(rows))
    }
}
