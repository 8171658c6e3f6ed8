//! Ledger entries: the append-only audit trail of every item mutation.

use core::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Persisted textual form of a ledger timestamp (UTC, second precision).
///
/// Fixed width, so lexical order equals chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Kind of change a ledger entry records.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerAction {
    Add,
    Remove,
    Update,
}

impl LedgerAction {
    pub fn as_str(self) -> &'static str {
        match self {
            LedgerAction::Add => "add",
            LedgerAction::Remove => "remove",
            LedgerAction::Update => "update",
        }
    }
}

impl core::fmt::Display for LedgerAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(LedgerAction::Add),
            "remove" => Ok(LedgerAction::Remove),
            "update" => Ok(LedgerAction::Update),
            other => Err(DomainError::invalid_action(other)),
        }
    }
}

/// Store-assigned ledger entry identifier. Strictly increasing per store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerEntryId(pub i64);

impl core::fmt::Display for LedgerEntryId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A ledger entry ready to be appended (not yet assigned an id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLedgerEntry {
    pub timestamp: DateTime<Utc>,
    pub action: LedgerAction,
    pub item: String,
    pub quantity_change: i64,
    pub note: String,
}

impl NewLedgerEntry {
    /// Build an entry, truncating `timestamp` to whole seconds.
    ///
    /// Fails if `note` is blank; every ledger entry must say something.
    pub fn new(
        timestamp: DateTime<Utc>,
        action: LedgerAction,
        item: impl Into<String>,
        quantity_change: i64,
        note: impl Into<String>,
    ) -> DomainResult<Self> {
        let note = note.into();
        if note.trim().is_empty() {
            return Err(DomainError::validation("ledger note cannot be empty"));
        }
        Ok(Self {
            timestamp: truncate_to_seconds(timestamp),
            action,
            item: item.into(),
            quantity_change,
            note,
        })
    }

    /// Attach the id assigned by the store.
    pub fn into_entry(self, id: LedgerEntryId) -> LedgerEntry {
        LedgerEntry {
            id,
            timestamp: self.timestamp,
            action: self.action,
            item: self.item,
            quantity_change: self.quantity_change,
            note: self.note,
        }
    }
}

/// An immutable, persisted ledger entry.
///
/// `item` is a weak reference by name; the item may no longer exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub timestamp: DateTime<Utc>,
    pub action: LedgerAction,
    pub item: String,
    pub quantity_change: i64,
    pub note: String,
}

impl LedgerEntry {
    /// Replay order: timestamp first, id breaks same-second ties.
    pub fn replay_key(&self) -> (DateTime<Utc>, LedgerEntryId) {
        (self.timestamp, self.id)
    }

    pub fn timestamp_text(&self) -> String {
        format_timestamp(self.timestamp)
    }
}

/// Sort entries into replay order in place.
pub fn sort_for_replay(entries: &mut [LedgerEntry]) {
    entries.sort_by_key(LedgerEntry::replay_key);
}

pub fn truncate_to_seconds(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(0)
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(text: &str) -> DomainResult<DateTime<Utc>> {
    chrono::NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| DomainError::validation(format!("timestamp '{text}': {e}")))
}
