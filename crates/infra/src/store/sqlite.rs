//! SQLite-backed inventory store.
//!
//! Schema (created idempotently by [`SqliteStore::bootstrap`]):
//!
//! - `items(item, quantity, description)` with a unique index on `item`.
//!   Reports read `ORDER BY rowid`, which is insertion order since updates
//!   rewrite a row in place. Older databases may hold repeated names; those
//!   are collapsed to the most recently inserted row before the index is
//!   built.
//! - `ledger(id, timestamp, action, item, quantity_change, note)` with
//!   `id INTEGER PRIMARY KEY AUTOINCREMENT` so ids are never reused, and
//!   triggers that abort any `UPDATE` or `DELETE`.
//!
//! ## Error Mapping
//!
//! | SQLite result | StoreError |
//! |---|---|
//! | `SQLITE_CONSTRAINT_UNIQUE` / `_PRIMARYKEY` on insert | `DuplicateKey` |
//! | zero rows changed by update/delete | `NotFound` |
//! | undecodable ledger row | `Invalid` |
//! | anything else | `Unavailable` |

use std::path::Path;

use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior, params};
use tracing::{instrument, warn};

use quartermaster_core::ledger::{format_timestamp, parse_timestamp};
use quartermaster_core::{Item, ItemState, LedgerAction, LedgerEntry, LedgerEntryId, NewLedgerEntry, Snapshot};

use super::{InventoryStore, LedgerWriter, SnapshotStore, StoreError, StoreTransaction};

const ITEMS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS items (
        item        TEXT NOT NULL,
        quantity    INTEGER NOT NULL,
        description TEXT NOT NULL
    );
";

/// Keeps the last row written for each name.
const COLLAPSE_DUPLICATE_ITEMS: &str = "
    DELETE FROM items
    WHERE rowid NOT IN (SELECT MAX(rowid) FROM items GROUP BY item)
";

const SCHEMA: &str = "
    CREATE UNIQUE INDEX IF NOT EXISTS idx_items_item ON items(item);

    CREATE TABLE IF NOT EXISTS ledger (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp       TEXT NOT NULL,
        action          TEXT NOT NULL CHECK (action IN ('add', 'remove', 'update')),
        item            TEXT NOT NULL,
        quantity_change INTEGER NOT NULL,
        note            TEXT NOT NULL CHECK (length(trim(note)) > 0)
    );

    CREATE INDEX IF NOT EXISTS idx_ledger_replay ON ledger(timestamp, id);

    CREATE TRIGGER IF NOT EXISTS ledger_no_update BEFORE UPDATE ON ledger
    BEGIN
        SELECT RAISE(ABORT, 'ledger is append-only');
    END;

    CREATE TRIGGER IF NOT EXISTS ledger_no_delete BEFORE DELETE ON ledger
    BEGIN
        SELECT RAISE(ABORT, 'ledger is append-only');
    END;
";

fn unavailable(err: rusqlite::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && matches!(
                    e.extended_code,
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
        }
        _ => false,
    }
}

/// Durable inventory store over a single SQLite connection.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and bootstrap the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::unavailable(format!("create directory '{}': {e}", parent.display()))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|e| StoreError::unavailable(format!("open '{}': {e}", path.display())))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(unavailable)?;

        Self::from_connection(conn)
    }

    /// A private in-memory database (tests, dry runs).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory().map_err(unavailable)?)
    }

    /// Wrap an existing connection and bootstrap the schema.
    pub fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = Self { conn };
        store.bootstrap()?;
        Ok(store)
    }

    /// Create tables, indexes and triggers if missing. Safe to repeat.
    ///
    /// An `items` table created without the unique index may carry several
    /// rows per name; all but the last inserted are dropped first.
    pub fn bootstrap(&self) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction().map_err(unavailable)?;
        tx.execute_batch(ITEMS_TABLE).map_err(unavailable)?;
        let collapsed = tx.execute(COLLAPSE_DUPLICATE_ITEMS, []).map_err(unavailable)?;
        if collapsed > 0 {
            warn!(collapsed, "dropped repeated item rows before indexing");
        }
        tx.execute_batch(SCHEMA).map_err(unavailable)?;
        tx.commit().map_err(unavailable)
    }

    /// Raw connection access for maintenance tasks.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl InventoryStore for SqliteStore {
    type Tx<'a> = SqliteTransaction<'a>;

    fn begin(&mut self) -> Result<Self::Tx<'_>, StoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(unavailable)?;
        Ok(SqliteTransaction { tx })
    }

    fn snapshot(&self) -> Result<Snapshot, StoreError> {
        read_items(&self.conn)
    }

    #[instrument(level = "debug", skip(self))]
    fn report(&self) -> Result<Vec<Item>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT item, quantity, description FROM items ORDER BY rowid")
            .map_err(unavailable)?;
        let rows = stmt
            .query_map([], |row| Ok(Item::new(row.get::<_, String>(0)?, row.get(1)?, row.get::<_, String>(2)?)))
            .map_err(unavailable)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(unavailable)
    }

    #[instrument(level = "debug", skip(self))]
    fn ledger_entries(&self) -> Result<Vec<LedgerEntry>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, action, item, quantity_change, note
                 FROM ledger
                 ORDER BY timestamp, id",
            )
            .map_err(unavailable)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .map_err(unavailable)?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, timestamp, action, item, quantity_change, note) = row.map_err(unavailable)?;
            entries.push(LedgerEntry {
                id: LedgerEntryId(id),
                timestamp: parse_timestamp(&timestamp)?,
                action: action.parse::<LedgerAction>()?,
                item,
                quantity_change,
                note,
            });
        }
        Ok(entries)
    }
}

fn read_items(conn: &Connection) -> Result<Snapshot, StoreError> {
    let mut stmt = conn
        .prepare("SELECT item, quantity, description FROM items")
        .map_err(unavailable)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, ItemState::new(row.get(1)?, row.get::<_, String>(2)?)))
        })
        .map_err(unavailable)?;
    rows.collect::<rusqlite::Result<Snapshot>>().map_err(unavailable)
}

/// Write transaction over a [`SqliteStore`]. Rolls back when dropped uncommitted.
#[derive(Debug)]
pub struct SqliteTransaction<'a> {
    tx: Transaction<'a>,
}

impl SnapshotStore for SqliteTransaction<'_> {
    fn read_all(&self) -> Result<Snapshot, StoreError> {
        read_items(&self.tx)
    }

    #[instrument(level = "debug", skip(self, item), fields(item = %item.name))]
    fn insert(&mut self, item: &Item) -> Result<(), StoreError> {
        self.tx
            .execute(
                "INSERT INTO items (item, quantity, description) VALUES (?1, ?2, ?3)",
                params![item.name, item.quantity, item.description],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::DuplicateKey(item.name.clone())
                } else {
                    unavailable(e)
                }
            })?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self, item), fields(item = %item.name))]
    fn update(&mut self, item: &Item) -> Result<(), StoreError> {
        let changed = self
            .tx
            .execute(
                "UPDATE items SET quantity = ?2, description = ?3 WHERE item = ?1",
                params![item.name, item.quantity, item.description],
            )
            .map_err(unavailable)?;
        if changed == 0 {
            return Err(StoreError::NotFound(item.name.clone()));
        }
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    fn delete(&mut self, name: &str) -> Result<(), StoreError> {
        let changed = self
            .tx
            .execute("DELETE FROM items WHERE item = ?1", params![name])
            .map_err(unavailable)?;
        if changed == 0 {
            return Err(StoreError::NotFound(name.to_string()));
        }
        Ok(())
    }
}

impl LedgerWriter for SqliteTransaction<'_> {
    #[instrument(level = "debug", skip(self, entry), fields(action = %entry.action, item = %entry.item))]
    fn append(&mut self, entry: &NewLedgerEntry) -> Result<LedgerEntryId, StoreError> {
        self.tx
            .execute(
                "INSERT INTO ledger (timestamp, action, item, quantity_change, note)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    format_timestamp(entry.timestamp),
                    entry.action.as_str(),
                    entry.item,
                    entry.quantity_change,
                    entry.note,
                ],
            )
            .map_err(unavailable)?;
        Ok(LedgerEntryId(self.tx.last_insert_rowid()))
    }
}

impl StoreTransaction for SqliteTransaction<'_> {
    fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().map_err(unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn entry(secs: i64, action: LedgerAction, item: &str, change: i64) -> NewLedgerEntry {
        NewLedgerEntry::new(ts(secs), action, item, change, "note").unwrap()
    }

    fn store_with(items: &[Item]) -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut tx = store.begin().unwrap();
        for item in items {
            tx.insert(item).unwrap();
        }
        tx.commit().unwrap();
        store
    }

    #[test]
    fn bootstrap_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.bootstrap().unwrap();
        store.bootstrap().unwrap();
        assert!(store.snapshot().unwrap().is_empty());
    }

    #[test]
    fn insert_duplicate_maps_to_duplicate_key() {
        let mut store = store_with(&[Item::new("rope", 10, "sturdy")]);
        let mut tx = store.begin().unwrap();
        let err = tx.insert(&Item::new("rope", 3, "again")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(name) if name == "rope"));
    }

    #[test]
    fn update_and_delete_missing_map_to_not_found() {
        let mut store = store_with(&[]);
        let mut tx = store.begin().unwrap();
        assert!(matches!(
            tx.update(&Item::new("ghost", 1, "x")),
            Err(StoreError::NotFound(name)) if name == "ghost"
        ));
        assert!(matches!(tx.delete("ghost"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn update_keeps_report_position() {
        let mut store = store_with(&[
            Item::new("torch", 5, "bright"),
            Item::new("axe", 1, "sharp"),
        ]);
        let mut tx = store.begin().unwrap();
        tx.update(&Item::new("torch", 7, "brighter")).unwrap();
        tx.commit().unwrap();

        assert_eq!(
            store.report().unwrap(),
            vec![Item::new("torch", 7, "brighter"), Item::new("axe", 1, "sharp")]
        );
    }

    #[test]
    fn dropped_transaction_rolls_back() {
        let mut store = store_with(&[Item::new("rope", 10, "sturdy")]);
        {
            let mut tx = store.begin().unwrap();
            tx.delete("rope").unwrap();
            tx.append(&entry(1, LedgerAction::Remove, "rope", -10)).unwrap();
        }
        assert!(store.snapshot().unwrap().contains("rope"));
        assert!(store.ledger_entries().unwrap().is_empty());
    }

    #[test]
    fn ledger_reads_back_in_replay_order() {
        let mut store = store_with(&[]);
        let mut tx = store.begin().unwrap();
        let first = tx.append(&entry(20, LedgerAction::Add, "a", 1)).unwrap();
        let second = tx.append(&entry(10, LedgerAction::Update, "b", -2)).unwrap();
        let third = tx.append(&entry(20, LedgerAction::Remove, "c", -3)).unwrap();
        tx.commit().unwrap();

        assert!(first < second && second < third);
        let ids: Vec<_> = store.ledger_entries().unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![second, first, third]);
    }

    #[test]
    fn ledger_rows_cannot_be_rewritten() {
        let mut store = store_with(&[]);
        let mut tx = store.begin().unwrap();
        tx.append(&entry(1, LedgerAction::Add, "rope", 10)).unwrap();
        tx.commit().unwrap();

        assert!(store.connection().execute("UPDATE ledger SET quantity_change = 0", []).is_err());
        assert!(store.connection().execute("DELETE FROM ledger", []).is_err());
        assert_eq!(store.ledger_entries().unwrap()[0].quantity_change, 10);
    }

    #[test]
    fn unknown_action_row_is_invalid() {
        let store = store_with(&[]);
        // The CHECK constraint blocks bad actions, so swap in an unchecked table.
        store
            .connection()
            .execute_batch(
                "DROP TRIGGER ledger_no_update;
                 DROP TRIGGER ledger_no_delete;
                 DROP TABLE ledger;
                 CREATE TABLE ledger (
                     id INTEGER PRIMARY KEY, timestamp TEXT, action TEXT,
                     item TEXT, quantity_change INTEGER, note TEXT
                 );
                 INSERT INTO ledger VALUES (1, '2024-01-01 00:00:00', 'restock', 'rope', 1, 'x');",
            )
            .unwrap();

        assert!(matches!(store.ledger_entries(), Err(StoreError::Invalid(_))));
    }

    fn legacy_database(rows: &[(&str, i64, &str)]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE items (item TEXT, quantity INTEGER, description TEXT);
             CREATE TABLE ledger (
                 id INTEGER PRIMARY KEY, timestamp TEXT, action TEXT,
                 item TEXT, quantity_change INTEGER, note TEXT
             );",
        )
        .unwrap();
        for (item, quantity, description) in rows {
            conn.execute(
                "INSERT INTO items (item, quantity, description) VALUES (?1, ?2, ?3)",
                params![item, quantity, description],
            )
            .unwrap();
        }
        (dir, path)
    }

    #[test]
    fn legacy_database_without_index_opens() {
        let (_dir, path) = legacy_database(&[("rope", 10, "sturdy"), ("torch", 5, "bright")]);

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(
            store.report().unwrap(),
            vec![Item::new("rope", 10, "sturdy"), Item::new("torch", 5, "bright")]
        );
    }

    #[test]
    fn legacy_repeated_names_collapse_to_last_row() {
        let (_dir, path) = legacy_database(&[
            ("rope", 10, "sturdy"),
            ("torch", 5, "bright"),
            ("rope", 3, "frayed"),
        ]);

        let mut store = SqliteStore::open(&path).unwrap();
        assert_eq!(
            store.report().unwrap(),
            vec![Item::new("torch", 5, "bright"), Item::new("rope", 3, "frayed")]
        );

        let mut tx = store.begin().unwrap();
        assert!(matches!(
            tx.insert(&Item::new("rope", 1, "again")),
            Err(StoreError::DuplicateKey(name)) if name == "rope"
        ));
    }

    #[test]
    fn file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("wagon.db");

        {
            let mut store = SqliteStore::open(&path).unwrap();
            let mut tx = store.begin().unwrap();
            tx.insert(&Item::new("rope", 10, "sturdy")).unwrap();
            tx.append(&entry(1, LedgerAction::Add, "rope", 10)).unwrap();
            tx.commit().unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.report().unwrap(), vec![Item::new("rope", 10, "sturdy")]);
        assert_eq!(store.ledger_entries().unwrap().len(), 1);
    }
}
