//! `quartermaster-core`: the inventory data model.
//!
//! This crate contains **pure** types (no IO): items, snapshots, ledger
//! entries and the clock abstraction used to timestamp them.

pub mod clock;
pub mod error;
pub mod item;
pub mod ledger;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{DomainError, DomainResult};
pub use item::{Item, ItemState, Snapshot};
pub use ledger::{LedgerAction, LedgerEntry, LedgerEntryId, NewLedgerEntry};
