//! Inventory reconciliation domain.
//!
//! This crate turns a manifest into a desired state and diffs it against the
//! current snapshot, implemented purely as deterministic domain logic (no IO,
//! no storage).

pub mod manifest;
pub mod plan;

pub use manifest::{DuplicatePolicy, Manifest, ManifestEntry, ManifestError};
pub use plan::{Mutation, PlanSummary, ReconciliationPlan};
