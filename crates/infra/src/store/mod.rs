//! Inventory persistence boundary.
//!
//! Two logical relations live behind these traits: the item snapshot (keyed by
//! name) and the append-only ledger. Every write happens inside a
//! [`StoreTransaction`] so a reconciliation pass commits or rolls back as one
//! unit.
//!
//! ## Transaction Semantics
//!
//! - `InventoryStore::begin()` opens a transaction that sees its own writes.
//! - `StoreTransaction::commit()` makes every staged write durable at once.
//! - Dropping a transaction without committing discards all of its writes.
//!
//! ## Ledger Ordering
//!
//! Ledger ids are assigned by the store and strictly increase. Readers replay
//! the ledger ordered by `(timestamp, id)`; `ledger_entries()` returns exactly
//! that order.

pub mod in_memory;
pub mod sqlite;

pub use in_memory::{InMemoryStore, InMemoryTransaction};
pub use sqlite::{SqliteStore, SqliteTransaction};

use thiserror::Error;

use quartermaster_core::{DomainError, Item, LedgerEntry, LedgerEntryId, NewLedgerEntry, Snapshot};

/// Store operation error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An insert targeted a name that already exists.
    #[error("item already exists: {0}")]
    DuplicateKey(String),

    /// An update or delete targeted a name that does not exist.
    #[error("item not found: {0}")]
    NotFound(String),

    /// The backing store failed or could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A record was rejected by the data model (on write or on decode).
    #[error("invalid record: {0}")]
    Invalid(#[from] DomainError),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

/// Current item state, keyed by name.
pub trait SnapshotStore {
    /// Every current item.
    fn read_all(&self) -> Result<Snapshot, StoreError>;

    /// Fails with `DuplicateKey` if `item.name` is already present.
    fn insert(&mut self, item: &Item) -> Result<(), StoreError>;

    /// Fails with `NotFound` if `item.name` is absent.
    fn update(&mut self, item: &Item) -> Result<(), StoreError>;

    /// Fails with `NotFound` if `name` is absent.
    fn delete(&mut self, name: &str) -> Result<(), StoreError>;
}

/// Append-only audit log writer.
pub trait LedgerWriter {
    /// Append one entry and return the id the store assigned to it.
    fn append(&mut self, entry: &NewLedgerEntry) -> Result<LedgerEntryId, StoreError>;
}

/// A unit of work spanning snapshot writes and ledger appends.
pub trait StoreTransaction: SnapshotStore + LedgerWriter {
    fn commit(self) -> Result<(), StoreError>;
}

/// A durable inventory store: transactional writes plus read-only views.
pub trait InventoryStore {
    type Tx<'a>: StoreTransaction
    where
        Self: 'a;

    /// Open a write transaction.
    fn begin(&mut self) -> Result<Self::Tx<'_>, StoreError>;

    /// Every current item, outside any transaction.
    fn snapshot(&self) -> Result<Snapshot, StoreError>;

    /// Current items in insertion order (for display).
    fn report(&self) -> Result<Vec<Item>, StoreError>;

    /// All ledger entries ordered by `(timestamp, id)`.
    fn ledger_entries(&self) -> Result<Vec<LedgerEntry>, StoreError>;
}
