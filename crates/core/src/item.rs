//! Items and the snapshot they form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Current state of an item, without its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemState {
    pub quantity: i64,
    pub description: String,
}

impl ItemState {
    pub fn new(quantity: i64, description: impl Into<String>) -> Self {
        Self {
            quantity,
            description: description.into(),
        }
    }
}

/// A named inventory item.
///
/// `name` is case-sensitive and acts as the primary key. Quantities carry no
/// range constraint; negative values are representable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub quantity: i64,
    pub description: String,
}

impl Item {
    pub fn new(name: impl Into<String>, quantity: i64, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity,
            description: description.into(),
        }
    }

    pub fn state(&self) -> ItemState {
        ItemState::new(self.quantity, self.description.clone())
    }

    pub fn into_parts(self) -> (String, ItemState) {
        (
            self.name,
            ItemState {
                quantity: self.quantity,
                description: self.description,
            },
        )
    }
}

/// Every current item keyed by name.
///
/// Ordered by name so that iteration over a snapshot is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(BTreeMap<String, ItemState>);

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ItemState> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Insert or replace an item, returning the previous state if any.
    pub fn upsert(&mut self, name: impl Into<String>, state: ItemState) -> Option<ItemState> {
        self.0.insert(name.into(), state)
    }

    pub fn remove(&mut self, name: &str) -> Option<ItemState> {
        self.0.remove(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ItemState)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

}

impl FromIterator<Item> for Snapshot {
    fn from_iter<T: IntoIterator<Item = Item>>(iter: T) -> Self {
        Self(iter.into_iter().map(Item::into_parts).collect())
    }
}

impl FromIterator<(String, ItemState)> for Snapshot {
    fn from_iter<T: IntoIterator<Item = (String, ItemState)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Snapshot {
    type Item = (String, ItemState);
    type IntoIter = std::collections::btree_map::IntoIter<String, ItemState>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
