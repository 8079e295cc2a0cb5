//! Store-facing reconciliation of one partition

use super::{guard, reconcile, FreshListings, ReconcilePlan};
use crate::model::CrawlTarget;
use crate::storage::Storage;
use crate::TrackerError;

/// What a reconciliation pass changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub target: CrawlTarget,
    pub fresh: usize,
    pub inserted: usize,
    pub reactivated: usize,
    pub deactivated: usize,
}

impl ReconcileOutcome {
    fn new(target: &CrawlTarget, fresh: &FreshListings, plan: &ReconcilePlan) -> Self {
        Self {
            target: target.clone(),
            fresh: fresh.urls.len(),
            inserted: plan.to_insert.len(),
            reactivated: plan.to_reactivate.len(),
            deactivated: plan.to_deactivate.len(),
        }
    }
}

/// Guards and computes the plan of one partition without applying it
pub fn plan_partition(
    store: &dyn Storage,
    target: &CrawlTarget,
    fresh: &FreshListings,
) -> Result<ReconcilePlan, TrackerError> {
    let active = store.load_active(target)?;
    guard(target, fresh, active.len())?;
    let inactive = store.load_inactive(target)?;

    Ok(reconcile(target, &fresh.urls, &active, &inactive))
}

/// Reconciles one partition against the store
///
/// The caller must hold exclusive access to the partition for the whole call
/// so that no other pass interleaves between load and apply.
///
/// # Returns
///
/// * `Ok(ReconcileOutcome)` - The plan was applied
/// * `Err(TrackerError::Reconcile)` - The fresh set was rejected; nothing changed
/// * `Err(TrackerError)` - Loading or applying failed
pub fn reconcile_partition(
    store: &mut dyn Storage,
    target: &CrawlTarget,
    fresh: &FreshListings,
) -> Result<ReconcileOutcome, TrackerError> {
    let plan = plan_partition(&*store, target, fresh)?;
    store.apply_plan(target, &plan)?;

    let outcome = ReconcileOutcome::new(target, fresh, &plan);
    tracing::info!(
        "[{}] {} fresh: {} inserted, {} reactivated, {} deactivated",
        target,
        outcome.fresh,
        outcome.inserted,
        outcome.reactivated,
        outcome.deactivated
    );

    Ok(outcome)
}

/// Outcome a plan would have, for dry runs
pub fn preview(target: &CrawlTarget, fresh: &FreshListings, plan: &ReconcilePlan) -> ReconcileOutcome {
    ReconcileOutcome::new(target, fresh, plan)
}
