//! Manifest: the desired-state input of a reconciliation pass.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use quartermaster_core::{Item, ItemState, Snapshot};

/// Manifest parsing / keying error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ManifestError {
    /// The manifest could not be read or decoded.
    #[error("manifest unreadable: {0}")]
    Unreadable(String),

    /// The same item name appeared more than once under `DuplicatePolicy::Reject`.
    #[error("manifest lists item '{0}' more than once")]
    DuplicateItem(String),
}

impl ManifestError {
    pub fn unreadable(msg: impl Into<String>) -> Self {
        Self::Unreadable(msg.into())
    }
}

/// How repeated item names inside one manifest are treated.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// The last occurrence of a name wins.
    #[default]
    LastWins,
    /// Any repeated name fails the whole manifest.
    Reject,
}

impl core::str::FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "last-wins" => Ok(DuplicatePolicy::LastWins),
            "reject" => Ok(DuplicatePolicy::Reject),
            other => Err(format!(
                "unknown duplicate policy '{other}' (expected 'last-wins' or 'reject')"
            )),
        }
    }
}

/// One manifest record: `{ "item": .., "quantity": .., "description": .. }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub item: String,
    #[serde(deserialize_with = "integer_or_numeric_text")]
    pub quantity: i64,
    pub description: String,
}

impl ManifestEntry {
    pub fn new(item: impl Into<String>, quantity: i64, description: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            quantity,
            description: description.into(),
        }
    }
}

impl From<ManifestEntry> for Item {
    fn from(e: ManifestEntry) -> Self {
        Item::new(e.item, e.quantity, e.description)
    }
}

/// Quantities may be written as JSON integers or as strings holding an integer.
fn integer_or_numeric_text<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| serde::de::Error::custom(format!("quantity '{s}' is not an integer: {e}"))),
    }
}

/// An ordered sequence of manifest entries, read once per pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    /// Parse a JSON array of manifest records.
    pub fn from_json(text: &str) -> Result<Self, ManifestError> {
        serde_json::from_str(text).map_err(|e| ManifestError::unreadable(e.to_string()))
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key the manifest by item name according to `policy`.
    pub fn keyed(&self, policy: DuplicatePolicy) -> Result<Snapshot, ManifestError> {
        let mut desired = Snapshot::new();
        for e in &self.entries {
            let previous = desired.upsert(e.item.clone(), ItemState::new(e.quantity, e.description.clone()));
            if previous.is_some() && policy == DuplicatePolicy::Reject {
                return Err(ManifestError::DuplicateItem(e.item.clone()));
            }
        }
        Ok(desired)
    }
}

impl FromIterator<ManifestEntry> for Manifest {
    fn from_iter<T: IntoIterator<Item = ManifestEntry>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
