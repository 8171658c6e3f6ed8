//! Reconciliation pipeline (application-level orchestration).
//!
//! ```text
//! Manifest
//!   ↓
//! 1. Key manifest by name (duplicate policy applied, no store access yet)
//!   ↓
//! 2. Open one store transaction and read the current snapshot
//!   ↓
//! 3. Plan the diff (pure: removals, then additions, then updates)
//!   ↓
//! 4. Apply each mutation and append its ledger entry inside the transaction
//!   ↓
//! 5. Commit (or drop the transaction on any error, leaving nothing behind)
//! ```
//!
//! The planning rules live in `quartermaster_inventory::plan`; this module only
//! composes them with an [`InventoryStore`] and a [`Clock`].

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

use quartermaster_core::{Clock, Item, LedgerEntry};
use quartermaster_inventory::{
    DuplicatePolicy, Manifest, ManifestError, Mutation, PlanSummary, ReconciliationPlan,
};

use crate::store::{InventoryStore, LedgerWriter, SnapshotStore, StoreError, StoreTransaction};

/// Reconciliation pass failure.
///
/// Either way the store is left exactly as it was before the pass.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The manifest could not be turned into a desired state.
    #[error(transparent)]
    ManifestUnreadable(#[from] ManifestError),

    /// A storage operation failed mid-pass; the transaction was rolled back.
    #[error("reconciliation failed: {0}")]
    ReconciliationFailed(#[source] StoreError),
}

impl From<StoreError> for ReconcileError {
    fn from(value: StoreError) -> Self {
        ReconcileError::ReconciliationFailed(value)
    }
}

/// What a committed pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationOutcome {
    /// Ledger entries written by this pass, in the order they were appended.
    pub entries: Vec<LedgerEntry>,
    pub summary: PlanSummary,
}

impl ReconciliationOutcome {
    /// True when the snapshot already matched the manifest.
    pub fn is_noop(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Applies manifests to an inventory store.
///
/// Holds no store itself; the driver owns the store and lends it per pass.
#[derive(Debug, Clone)]
pub struct Reconciler<C> {
    clock: C,
    duplicates: DuplicatePolicy,
}

impl<C: Clock> Reconciler<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            duplicates: DuplicatePolicy::default(),
        }
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    /// Compute the plan a pass would apply, without writing anything.
    pub fn preview<S: InventoryStore>(
        &self,
        store: &S,
        manifest: &Manifest,
    ) -> Result<ReconciliationPlan, ReconcileError> {
        let latest = manifest.keyed(self.duplicates)?;
        let existing = store.snapshot()?;
        Ok(ReconciliationPlan::compute(&existing, &latest))
    }

    /// Run one reconciliation pass against `store`.
    ///
    /// Every snapshot mutation and its ledger entry are committed together, or
    /// not at all.
    pub fn reconcile<S: InventoryStore>(
        &self,
        store: &mut S,
        manifest: &Manifest,
    ) -> Result<ReconciliationOutcome, ReconcileError> {
        let span = info_span!("reconcile", manifest_entries = manifest.len());
        let _guard = span.enter();

        let latest = manifest.keyed(self.duplicates).inspect_err(|e| {
            warn!(error = %e, "manifest rejected; store untouched");
        })?;

        let outcome = self.apply(store, &latest).inspect_err(|e| {
            warn!(error = %e, "reconciliation rolled back");
        })?;

        if outcome.is_noop() {
            info!("inventory already matches manifest");
        } else {
            info!(summary = %outcome.summary, "reconciliation committed");
        }
        Ok(outcome)
    }

    fn apply<S: InventoryStore>(
        &self,
        store: &mut S,
        latest: &quartermaster_core::Snapshot,
    ) -> Result<ReconciliationOutcome, StoreError> {
        let mut tx = store.begin()?;
        let existing = tx.read_all()?;
        let plan = ReconciliationPlan::compute(&existing, latest);
        if plan.is_empty() {
            return Ok(ReconciliationOutcome::default());
        }

        let summary = plan.summary();
        let timestamp = self.clock.now();
        let mut entries = Vec::with_capacity(plan.len());

        for mutation in plan {
            apply_mutation(&mut tx, &mutation)?;
            let entry = mutation.ledger_entry(timestamp)?;
            let id = tx.append(&entry)?;
            debug!(
                id = %id,
                action = %entry.action,
                item = %entry.item,
                quantity_change = entry.quantity_change,
                "ledger entry appended"
            );
            entries.push(entry.into_entry(id));
        }

        tx.commit()?;
        Ok(ReconciliationOutcome { entries, summary })
    }
}

fn apply_mutation<T: SnapshotStore>(tx: &mut T, mutation: &Mutation) -> Result<(), StoreError> {
    match mutation {
        Mutation::Remove { name, .. } => tx.delete(name),
        Mutation::Add { name, state } => {
            tx.insert(&Item::new(name.clone(), state.quantity, state.description.clone()))
        }
        Mutation::Update { name, next, .. } => {
            tx.update(&Item::new(name.clone(), next.quantity, next.description.clone()))
        }
    }
}
