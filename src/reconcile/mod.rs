//! Reconciliation of freshly crawled URLs against persisted listing state
//!
//! `reconcile` is a pure set computation over one partition. Given the fresh
//! URL set `F`, the active URLs `A` and the inactive URLs `I`:
//!
//! - `to_insert     = F - (A ∪ I)`
//! - `to_reactivate = F ∩ (I - A)`
//! - `to_deactivate = A - F`
//!
//! The three sets are pairwise disjoint. `guard` decides whether a fresh set
//! can be trusted at all before any of this is applied.

mod apply;

pub use apply::{plan_partition, preview, reconcile_partition, ReconcileOutcome};

use crate::adapters::Marketplace;
use crate::model::{CrawlTarget, ListingRecord};
use crate::url::ListingUrl;
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

/// Reasons to skip a reconciliation pass
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("[{target}] No marketplace crawl succeeded ({failed} failed)")]
    NoSuccessfulCrawl { target: String, failed: usize },

    #[error("[{target}] Crawl returned no listings while {active} are active")]
    EmptyCrawl { target: String, active: usize },
}

/// Actions to apply to one partition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub to_insert: BTreeSet<ListingUrl>,
    pub to_reactivate: BTreeSet<ListingUrl>,
    pub to_deactivate: BTreeSet<ListingUrl>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty() && self.to_reactivate.is_empty() && self.to_deactivate.is_empty()
    }

    /// Total number of actions
    pub fn len(&self) -> usize {
        self.to_insert.len() + self.to_reactivate.len() + self.to_deactivate.len()
    }
}

/// Merged result of every marketplace crawl of one target
#[derive(Debug, Clone, Default)]
pub struct FreshListings {
    pub urls: HashSet<ListingUrl>,
    pub succeeded: Vec<Marketplace>,
    /// Failed marketplaces with the reason
    pub failed: Vec<(Marketplace, String)>,
}

impl FreshListings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the URL set of a successful crawl
    pub fn add_success(&mut self, marketplace: Marketplace, urls: impl IntoIterator<Item = ListingUrl>) {
        self.urls.extend(urls);
        self.succeeded.push(marketplace);
    }

    pub fn add_failure(&mut self, marketplace: Marketplace, reason: impl Into<String>) {
        self.failed.push((marketplace, reason.into()));
    }

    pub fn any_succeeded(&self) -> bool {
        !self.succeeded.is_empty()
    }
}

/// Computes the reconciliation plan of one partition
///
/// Records that do not belong to `target` are ignored.
///
/// # Arguments
///
/// * `target` - The partition being reconciled
/// * `fresh` - URLs found by the latest crawl
/// * `active` - Persisted active records
/// * `inactive` - Persisted inactive records
pub fn reconcile(
    target: &CrawlTarget,
    fresh: &HashSet<ListingUrl>,
    active: &[ListingRecord],
    inactive: &[ListingRecord],
) -> ReconcilePlan {
    let active: HashSet<&ListingUrl> = active
        .iter()
        .filter(|r| r.belongs_to(target))
        .map(|r| &r.url)
        .collect();
    let inactive: HashSet<&ListingUrl> = inactive
        .iter()
        .filter(|r| r.belongs_to(target))
        .map(|r| &r.url)
        .filter(|url| !active.contains(url))
        .collect();

    let mut plan = ReconcilePlan::default();
    for url in fresh {
        if inactive.contains(url) {
            plan.to_reactivate.insert(url.clone());
        } else if !active.contains(url) {
            plan.to_insert.insert(url.clone());
        }
    }
    plan.to_deactivate = active
        .into_iter()
        .filter(|url| !fresh.contains(*url))
        .cloned()
        .collect();

    plan
}

/// Rejects fresh sets that would wrongly deactivate a partition
///
/// A pass is skipped when no marketplace crawl succeeded, or when the merged
/// set is empty while the partition still has active listings.
pub fn guard(
    target: &CrawlTarget,
    fresh: &FreshListings,
    active_count: usize,
) -> Result<(), ReconcileError> {
    if !fresh.any_succeeded() {
        return Err(ReconcileError::NoSuccessfulCrawl {
            target: target.to_string(),
            failed: fresh.failed.len(),
        });
    }

    if fresh.urls.is_empty() && active_count > 0 {
        return Err(ReconcileError::EmptyCrawl {
            target: target.to_string(),
            active: active_count,
        });
    }

    Ok(())
}
