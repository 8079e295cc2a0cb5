//! Tracker coordinator - main sweep orchestration logic
//!
//! This module contains the sweep loop that coordinates all aspects of
//! tracking, including:
//! - Building marketplace adapters and the shared fetcher from configuration
//! - Expanding cities and enumerations into crawl targets
//! - Crawling every marketplace of a target and merging the results
//! - Reconciling each partition against storage
//! - Recording sweep runs and handling cancellation

use crate::adapters::{
    Marketplace, OlxAdapter, OtodomAdapter, SiteAdapter, DEFAULT_COUNT_SELECTOR,
    DEFAULT_LISTING_SELECTOR, OLX_BASE_URL, OTODOM_BASE_URL,
};
use crate::config::{Config, MarketplaceConfig, MarketplacesConfig};
use crate::crawler::{CrawlError, CrawlResult, Fetcher, PageCrawler, RetryPolicy};
use crate::model::CrawlTarget;
use crate::reconcile::{
    plan_partition, preview, reconcile_partition, FreshListings, ReconcileError, ReconcileOutcome,
};
use crate::storage::{RunStatus, SqliteStorage, Storage, StorageError};
use crate::{ConfigError, TrackerError};
use futures::stream::{self, StreamExt};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

/// What happened to one target during a sweep
#[derive(Debug)]
pub enum TargetOutcome {
    /// The partition was reconciled (or previewed in dry-run mode)
    Reconciled(ReconcileOutcome),
    /// The fresh set was rejected by the reconciliation guard
    Skipped(ReconcileError),
    /// Loading or writing the partition failed
    Failed(String),
    /// The sweep was cancelled before the partition was reconciled
    Cancelled,
}

/// Per-target report of a sweep
#[derive(Debug)]
pub struct TargetReport {
    pub target: CrawlTarget,
    pub succeeded_crawls: usize,
    pub failed_crawls: usize,
    pub outcome: TargetOutcome,
}

/// Totals of one sweep over every target
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub targets: usize,
    pub reconciled: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failed_crawls: usize,
    pub inserted: usize,
    pub reactivated: usize,
    pub deactivated: usize,
}

impl SweepSummary {
    pub fn from_reports(reports: &[TargetReport]) -> Self {
        let mut summary = Self::default();
        for report in reports {
            summary.record(report);
        }
        summary
    }

    fn record(&mut self, report: &TargetReport) {
        self.targets += 1;
        self.failed_crawls += report.failed_crawls;
        match &report.outcome {
            TargetOutcome::Reconciled(outcome) => {
                self.reconciled += 1;
                self.inserted += outcome.inserted;
                self.reactivated += outcome.reactivated;
                self.deactivated += outcome.deactivated;
            }
            TargetOutcome::Skipped(_) | TargetOutcome::Cancelled => self.skipped += 1,
            TargetOutcome::Failed(_) => self.failed += 1,
        }
    }
}

impl fmt::Display for SweepSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} targets ({} reconciled, {} skipped, {} failed), {} failed crawls; {} inserted, {} reactivated, {} deactivated",
            self.targets,
            self.reconciled,
            self.skipped,
            self.failed,
            self.failed_crawls,
            self.inserted,
            self.reactivated,
            self.deactivated
        )
    }
}

/// Main tracker coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    config_hash: String,
    storage: Arc<Mutex<SqliteStorage>>,
    crawler: PageCrawler,
    otodom: Option<OtodomAdapter>,
    olx: Option<OlxAdapter>,
    cancel: CancellationToken,
    dry_run: bool,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The tracker configuration
    /// * `config_hash` - Hash of the configuration file, recorded per run
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(TrackerError)` - Failed to open storage or build adapters
    pub fn new(config: Config, config_hash: impl Into<String>) -> Result<Self, TrackerError> {
        let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
        Self::with_storage(config, config_hash, storage)
    }

    /// Creates a coordinator around an already opened storage
    pub fn with_storage(
        config: Config,
        config_hash: impl Into<String>,
        storage: SqliteStorage,
    ) -> Result<Self, TrackerError> {
        let (otodom, olx) = build_adapters(&config.marketplaces)?;

        let policy = RetryPolicy::from_config(&config.retry);
        let fetcher = Arc::new(Fetcher::new(&config.http, policy)?);
        let cancel = CancellationToken::new();
        let crawler =
            PageCrawler::new(fetcher, config.crawler.page_limit).with_cancellation(cancel.clone());

        Ok(Self {
            config: Arc::new(config),
            config_hash: config_hash.into(),
            storage: Arc::new(Mutex::new(storage)),
            crawler,
            otodom,
            olx,
            cancel,
            dry_run: false,
        })
    }

    /// Computes plans without writing anything
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Token that stops the coordinator between page fetches
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn storage(&self) -> Arc<Mutex<SqliteStorage>> {
        Arc::clone(&self.storage)
    }

    /// Crawl targets of one sweep, in sweep order
    pub fn targets(&self) -> Vec<CrawlTarget> {
        let tracker = &self.config.tracker;
        CrawlTarget::expand(&tracker.cities, &tracker.estates, &tracker.offers)
    }

    /// Enabled marketplaces
    pub fn marketplaces(&self) -> Vec<Marketplace> {
        let mut enabled = Vec::new();
        if self.otodom.is_some() {
            enabled.push(Marketplace::Otodom);
        }
        if self.olx.is_some() {
            enabled.push(Marketplace::Olx);
        }
        enabled
    }

    /// Runs one sweep over every target
    ///
    /// Failed targets are logged and reported but never abort the sweep. The
    /// sweep is recorded in the runs table unless this is a dry run.
    pub async fn run_once(&self) -> Result<SweepSummary, TrackerError> {
        let run_id = if self.dry_run {
            None
        } else {
            Some(self.lock_storage(|storage| Ok(storage.create_run(&self.config_hash)?))?)
        };

        let started = Instant::now();
        let targets = self.targets();
        tracing::info!(
            "Starting sweep over {} targets on {:?}",
            targets.len(),
            self.marketplaces()
        );

        let reports: Vec<TargetReport> = stream::iter(targets)
            .map(|target| self.process_target(target))
            .buffer_unordered(self.config.tracker.max_concurrent_targets.max(1) as usize)
            .collect()
            .await;

        let summary = SweepSummary::from_reports(&reports);

        if let Some(run_id) = run_id {
            let status = if self.cancel.is_cancelled() {
                RunStatus::Interrupted
            } else {
                RunStatus::Completed
            };
            self.lock_storage(|storage| Ok(storage.finish_run(run_id, status)?))?;
        }

        tracing::info!("Sweep finished in {:?}: {}", started.elapsed(), summary);
        Ok(summary)
    }

    /// Runs sweeps every `interval-secs` until cancelled
    pub async fn run_forever(&self) -> Result<(), TrackerError> {
        let interval = Duration::from_secs(self.config.tracker.interval_secs);

        loop {
            let started = Instant::now();
            if let Err(e) = self.run_once().await {
                tracing::error!("Sweep failed: {}", e);
            }

            if self.cancel.is_cancelled() {
                break;
            }

            let wait = interval.saturating_sub(started.elapsed());
            tracing::info!("Next sweep in {}s", wait.as_secs());
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        tracing::info!("Tracker stopped");
        Ok(())
    }

    /// Crawls every enabled marketplace of a target and merges the results
    ///
    /// Marketplaces are crawled concurrently and fail independently.
    pub async fn crawl_target(&self, target: &CrawlTarget) -> FreshListings {
        let otodom = async {
            match &self.otodom {
                Some(adapter) => Some(self.crawl_marketplace(adapter, target).await),
                None => None,
            }
        };
        let olx = async {
            match &self.olx {
                Some(adapter) => Some(self.crawl_marketplace(adapter, target).await),
                None => None,
            }
        };
        let (otodom, olx) = tokio::join!(otodom, olx);

        let mut fresh = FreshListings::new();
        for (marketplace, result) in [otodom, olx].into_iter().flatten() {
            match result {
                Ok(crawl) => fresh.add_success(marketplace, crawl.urls),
                Err(e) => fresh.add_failure(marketplace, e.to_string()),
            }
        }
        fresh
    }

    async fn crawl_marketplace<A: SiteAdapter>(
        &self,
        adapter: &A,
        target: &CrawlTarget,
    ) -> (Marketplace, Result<CrawlResult, CrawlError>) {
        let marketplace = adapter.marketplace();
        tracing::info!("[{}] [{}] Start search for links...", marketplace, target);

        let result = self.crawler.crawl(adapter, target).await;
        if let Err(e) = &result {
            tracing::warn!("[{}] [{}] Crawl failed: {}", marketplace, target, e);
        }
        (marketplace, result)
    }

    /// Crawls and reconciles one target
    async fn process_target(&self, target: CrawlTarget) -> TargetReport {
        let fresh = self.crawl_target(&target).await;
        let succeeded_crawls = fresh.succeeded.len();
        let failed_crawls = fresh.failed.len();

        let outcome = if self.cancel.is_cancelled() {
            tracing::info!("[{}] Sweep cancelled, partition left untouched", target);
            TargetOutcome::Cancelled
        } else {
            match self.reconcile_target(&target, &fresh) {
                Ok(outcome) => TargetOutcome::Reconciled(outcome),
                Err(TrackerError::Reconcile(e)) => {
                    tracing::warn!("Reconciliation skipped: {}", e);
                    TargetOutcome::Skipped(e)
                }
                Err(e) => {
                    tracing::error!("[{}] Reconciliation failed: {}", target, e);
                    TargetOutcome::Failed(e.to_string())
                }
            }
        };

        TargetReport {
            target,
            succeeded_crawls,
            failed_crawls,
            outcome,
        }
    }

    /// Holds the storage lock from load to apply so passes never interleave
    fn reconcile_target(
        &self,
        target: &CrawlTarget,
        fresh: &FreshListings,
    ) -> Result<ReconcileOutcome, TrackerError> {
        self.lock_storage(|storage| {
            if self.dry_run {
                let plan = plan_partition(&*storage, target, fresh)?;
                let outcome = preview(target, fresh, &plan);
                tracing::info!(
                    "[{}] Dry run: would insert {}, reactivate {}, deactivate {}",
                    target,
                    outcome.inserted,
                    outcome.reactivated,
                    outcome.deactivated
                );
                Ok(outcome)
            } else {
                reconcile_partition(storage, target, fresh)
            }
        })
    }

    fn lock_storage<T>(
        &self,
        f: impl FnOnce(&mut SqliteStorage) -> Result<T, TrackerError>,
    ) -> Result<T, TrackerError> {
        let mut storage = self
            .storage
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;
        f(&mut *storage)
    }
}

/// Builds the enabled marketplace adapters
fn build_adapters(
    config: &MarketplacesConfig,
) -> Result<(Option<OtodomAdapter>, Option<OlxAdapter>), TrackerError> {
    let otodom = if config.otodom.enabled {
        Some(OtodomAdapter::new(base_url(&config.otodom, OTODOM_BASE_URL)?))
    } else {
        None
    };

    let olx = if config.olx.common.enabled {
        let adapter = OlxAdapter::new(
            base_url(&config.olx.common, OLX_BASE_URL)?,
            config
                .olx
                .count_selector
                .as_deref()
                .unwrap_or(DEFAULT_COUNT_SELECTOR),
            config
                .olx
                .listing_selector
                .as_deref()
                .unwrap_or(DEFAULT_LISTING_SELECTOR),
        )
        .map_err(|e| ConfigError::Validation(format!("olx: {}", e)))?;
        Some(adapter)
    } else {
        None
    };

    Ok((otodom, olx))
}

fn base_url(config: &MarketplaceConfig, default: &str) -> Result<Url, ConfigError> {
    let raw = config.base_url.as_deref().unwrap_or(default);
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", raw, e)))
}
