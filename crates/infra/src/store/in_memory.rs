//! In-memory inventory store backed by plain collections.

use std::collections::HashMap;

use quartermaster_core::ledger::sort_for_replay;
use quartermaster_core::{Item, ItemState, LedgerEntry, LedgerEntryId, NewLedgerEntry, Snapshot};

use super::{InventoryStore, LedgerWriter, SnapshotStore, StoreError, StoreTransaction};

#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredItem {
    /// Insertion sequence; kept across updates so reports stay in insertion order.
    seq: u64,
    state: ItemState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct State {
    items: HashMap<String, StoredItem>,
    next_seq: u64,
    ledger: Vec<LedgerEntry>,
    last_ledger_id: i64,
}

/// In-memory inventory store.
///
/// Intended for tests and dry runs. Transactions work on a copy of the whole
/// state and swap it in on commit.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: State,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with `items` and an empty ledger.
    pub fn seeded(items: impl IntoIterator<Item = Item>) -> Self {
        let mut state = State::default();
        for item in items {
            let (name, item_state) = item.into_parts();
            state.put(name, item_state);
        }
        Self { state }
    }
}

impl State {
    fn put(&mut self, name: String, state: ItemState) {
        self.next_seq += 1;
        self.items.insert(
            name,
            StoredItem {
                seq: self.next_seq,
                state,
            },
        );
    }
}

impl InventoryStore for InMemoryStore {
    type Tx<'a> = InMemoryTransaction<'a>;

    fn begin(&mut self) -> Result<Self::Tx<'_>, StoreError> {
        let staged = self.state.clone();
        Ok(InMemoryTransaction {
            target: &mut self.state,
            staged,
        })
    }

    fn snapshot(&self) -> Result<Snapshot, StoreError> {
        Ok(read_snapshot(&self.state))
    }

    fn report(&self) -> Result<Vec<Item>, StoreError> {
        let mut rows: Vec<_> = self.state.items.iter().collect();
        rows.sort_by_key(|(_, stored)| stored.seq);
        Ok(rows
            .into_iter()
            .map(|(name, stored)| Item::new(name.clone(), stored.state.quantity, stored.state.description.clone()))
            .collect())
    }

    fn ledger_entries(&self) -> Result<Vec<LedgerEntry>, StoreError> {
        let mut entries = self.state.ledger.clone();
        sort_for_replay(&mut entries);
        Ok(entries)
    }
}

fn read_snapshot(state: &State) -> Snapshot {
    state
        .items
        .iter()
        .map(|(name, stored)| (name.clone(), stored.state.clone()))
        .collect()
}

/// Write transaction over an [`InMemoryStore`].
#[derive(Debug)]
pub struct InMemoryTransaction<'a> {
    target: &'a mut State,
    staged: State,
}

impl SnapshotStore for InMemoryTransaction<'_> {
    fn read_all(&self) -> Result<Snapshot, StoreError> {
        Ok(read_snapshot(&self.staged))
    }

    fn insert(&mut self, item: &Item) -> Result<(), StoreError> {
        if self.staged.items.contains_key(&item.name) {
            return Err(StoreError::DuplicateKey(item.name.clone()));
        }
        self.staged.put(item.name.clone(), item.state());
        Ok(())
    }

    fn update(&mut self, item: &Item) -> Result<(), StoreError> {
        let stored = self
            .staged
            .items
            .get_mut(&item.name)
            .ok_or_else(|| StoreError::NotFound(item.name.clone()))?;
        stored.state = item.state();
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<(), StoreError> {
        self.staged
            .items
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }
}

impl LedgerWriter for InMemoryTransaction<'_> {
    fn append(&mut self, entry: &NewLedgerEntry) -> Result<LedgerEntryId, StoreError> {
        self.staged.last_ledger_id += 1;
        let id = LedgerEntryId(self.staged.last_ledger_id);
        self.staged.ledger.push(entry.clone().into_entry(id));
        Ok(id)
    }
}

impl StoreTransaction for InMemoryTransaction<'_> {
    fn commit(self) -> Result<(), StoreError> {
        *self.target = self.staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use quartermaster_core::LedgerAction;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn entry(secs: i64, item: &str) -> NewLedgerEntry {
        NewLedgerEntry::new(ts(secs), LedgerAction::Add, item, 1, "New supply secured.").unwrap()
    }

    #[test]
    fn insert_rejects_existing_names() {
        let mut store = InMemoryStore::seeded([Item::new("rope", 10, "sturdy")]);
        let mut tx = store.begin().unwrap();
        let err = tx.insert(&Item::new("rope", 1, "again")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(name) if name == "rope"));
    }

    #[test]
    fn update_and_delete_reject_missing_names() {
        let mut store = InMemoryStore::new();
        let mut tx = store.begin().unwrap();
        assert!(matches!(
            tx.update(&Item::new("ghost", 1, "x")),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(tx.delete("ghost"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn uncommitted_writes_are_discarded() {
        let mut store = InMemoryStore::seeded([Item::new("rope", 10, "sturdy")]);
        {
            let mut tx = store.begin().unwrap();
            tx.delete("rope").unwrap();
            tx.insert(&Item::new("torch", 5, "bright")).unwrap();
            tx.append(&entry(1, "torch")).unwrap();
            assert!(tx.read_all().unwrap().contains("torch"));
        }

        assert_eq!(store.report().unwrap(), vec![Item::new("rope", 10, "sturdy")]);
        assert!(store.ledger_entries().unwrap().is_empty());
    }

    #[test]
    fn committed_writes_are_visible() {
        let mut store = InMemoryStore::new();
        let mut tx = store.begin().unwrap();
        tx.insert(&Item::new("rope", 10, "sturdy")).unwrap();
        let id = tx.append(&entry(1, "rope")).unwrap();
        tx.commit().unwrap();

        assert_eq!(id, LedgerEntryId(1));
        assert!(store.snapshot().unwrap().contains("rope"));
        assert_eq!(store.ledger_entries().unwrap().len(), 1);
    }

    #[test]
    fn report_keeps_insertion_order_across_updates() {
        let mut store = InMemoryStore::seeded([
            Item::new("torch", 5, "bright"),
            Item::new("axe", 1, "sharp"),
        ]);
        let mut tx = store.begin().unwrap();
        tx.update(&Item::new("torch", 6, "brighter")).unwrap();
        tx.insert(&Item::new("bucket", 2, "tin")).unwrap();
        tx.commit().unwrap();

        let names: Vec<_> = store.report().unwrap().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["torch", "axe", "bucket"]);
    }

    #[test]
    fn ledger_replays_by_timestamp_then_id() {
        let mut store = InMemoryStore::new();
        let mut tx = store.begin().unwrap();
        tx.append(&entry(20, "a")).unwrap();
        tx.append(&entry(10, "b")).unwrap();
        tx.append(&entry(20, "c")).unwrap();
        tx.commit().unwrap();

        let items: Vec<_> = store
            .ledger_entries()
            .unwrap()
            .into_iter()
            .map(|e| (e.id.0, e.item))
            .collect();
        assert_eq!(
            items,
            vec![(2, "b".to_string()), (1, "a".to_string()), (3, "c".to_string())]
        );
    }
}
