//! Reconciliation planning: the set-based diff between a snapshot and a
//! desired state, plus the ledger wording for each change.
//!
//! Planning is pure and deterministic. Applying a plan to storage is the
//! infrastructure layer's job; this module only decides *what* changes and
//! *what* the ledger should say about it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quartermaster_core::{DomainResult, ItemState, LedgerAction, NewLedgerEntry, Snapshot};

pub const NOTE_REMOVED: &str = "Removed from service.";
pub const NOTE_ADDED: &str = "New supply secured.";
pub const NOTE_DETAILS_UPDATED: &str = "Details updated.";
pub const NOTE_DESCRIPTION_REFRESHED: &str = "Description refreshed";

/// A single item-level change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Mutation {
    Remove {
        name: String,
        previous: ItemState,
    },
    Add {
        name: String,
        state: ItemState,
    },
    Update {
        name: String,
        previous: ItemState,
        next: ItemState,
    },
}

impl Mutation {
    pub fn action(&self) -> LedgerAction {
        match self {
            Mutation::Remove { .. } => LedgerAction::Remove,
            Mutation::Add { .. } => LedgerAction::Add,
            Mutation::Update { .. } => LedgerAction::Update,
        }
    }

    pub fn item_name(&self) -> &str {
        match self {
            Mutation::Remove { name, .. } | Mutation::Add { name, .. } | Mutation::Update { name, .. } => name,
        }
    }

    /// Signed effect on the item's quantity.
    ///
    /// Saturates at the `i64` bounds instead of overflowing.
    pub fn quantity_change(&self) -> i64 {
        match self {
            Mutation::Remove { previous, .. } => 0i64.saturating_sub(previous.quantity),
            Mutation::Add { state, .. } => state.quantity,
            Mutation::Update { previous, next, .. } => next.quantity.saturating_sub(previous.quantity),
        }
    }

    pub fn note(&self) -> String {
        match self {
            Mutation::Remove { .. } => NOTE_REMOVED.to_string(),
            Mutation::Add { .. } => NOTE_ADDED.to_string(),
            Mutation::Update { previous, next, .. } => update_note(previous, next),
        }
    }

    /// The ledger entry recording this mutation at `timestamp`.
    pub fn ledger_entry(&self, timestamp: DateTime<Utc>) -> DomainResult<NewLedgerEntry> {
        NewLedgerEntry::new(
            timestamp,
            self.action(),
            self.item_name(),
            self.quantity_change(),
            self.note(),
        )
    }
}

fn update_note(previous: &ItemState, next: &ItemState) -> String {
    let mut parts = Vec::with_capacity(2);
    if previous.quantity != next.quantity {
        parts.push(format!("Quantity {}->{}", previous.quantity, next.quantity));
    }
    if previous.description != next.description {
        parts.push(NOTE_DESCRIPTION_REFRESHED.to_string());
    }
    if parts.is_empty() {
        return NOTE_DETAILS_UPDATED.to_string();
    }
    parts.join("; ")
}

/// Per-action counts of a plan.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub removed: usize,
    pub added: usize,
    pub updated: usize,
}

impl PlanSummary {
    pub fn total(&self) -> usize {
        self.removed + self.added + self.updated
    }
}

impl core::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} removed, {} added, {} updated",
            self.removed, self.added, self.updated
        )
    }
}

/// The ordered mutations that turn one snapshot into another.
///
/// Order is: every removal, then every addition, then every update. Within a
/// group mutations follow ascending item name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationPlan {
    mutations: Vec<Mutation>,
}

impl ReconciliationPlan {
    /// Diff `existing` against `latest` by item name.
    ///
    /// Items present in both with identical quantity and description produce
    /// no mutation, so planning against an already-reconciled snapshot yields
    /// an empty plan.
    pub fn compute(existing: &Snapshot, latest: &Snapshot) -> Self {
        let removals = existing
            .iter()
            .filter(|(name, _)| !latest.contains(name))
            .map(|(name, previous)| Mutation::Remove {
                name: name.to_string(),
                previous: previous.clone(),
            });

        let additions = latest
            .iter()
            .filter(|(name, _)| !existing.contains(name))
            .map(|(name, state)| Mutation::Add {
                name: name.to_string(),
                state: state.clone(),
            });

        let updates = latest.iter().filter_map(|(name, next)| {
            let previous = existing.get(name)?;
            (previous != next).then(|| Mutation::Update {
                name: name.to_string(),
                previous: previous.clone(),
                next: next.clone(),
            })
        });

        Self {
            mutations: removals.chain(additions).chain(updates).collect(),
        }
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for m in &self.mutations {
            match m.action() {
                LedgerAction::Remove => summary.removed += 1,
                LedgerAction::Add => summary.added += 1,
                LedgerAction::Update => summary.updated += 1,
            }
        }
        summary
    }

    /// Replay the plan onto an in-memory snapshot.
    #[cfg(test)]
    fn apply_to(&self, snapshot: &mut Snapshot) {
        for m in &self.mutations {
            match m {
                Mutation::Remove { name, .. } => {
                    snapshot.remove(name);
                }
                Mutation::Add { name, state } => {
                    snapshot.upsert(name.clone(), state.clone());
                }
                Mutation::Update { name, next, .. } => {
                    snapshot.upsert(name.clone(), next.clone());
                }
            }
        }
    }
}

impl IntoIterator for ReconciliationPlan {
    type Item = Mutation;
    type IntoIter = std::vec::IntoIter<Mutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.mutations.into_iter()
    }
}
