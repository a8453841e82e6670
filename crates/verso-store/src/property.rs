//! Address-keyed property maps and the per-snapshot map manager.

use std::collections::BTreeMap;
use std::ops::Bound;

use serde::{Deserialize, Serialize};
use verso_types::{Address, PropertyValue, ValueKind};

use crate::error::{StoreError, StoreResult};

/// A named, ordered mapping from [`Address`] to a value of one declared kind.
///
/// Entries are unique per address. Iteration and [`next_occupied`] follow
/// ascending address order.
///
/// [`next_occupied`]: PropertyMap::next_occupied
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyMap {
    name: String,
    kind: ValueKind,
    entries: BTreeMap<Address, PropertyValue>,
}

impl PropertyMap {
    /// Create an empty map.
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            entries: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind fixed at creation.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn get(&self, address: Address) -> Option<&PropertyValue> {
        self.entries.get(&address)
    }

    pub fn contains(&self, address: Address) -> bool {
        self.entries.contains_key(&address)
    }

    /// Store `value` at `address`, replacing any previous value.
    ///
    /// Fails with [`StoreError::KindMismatch`] if the value's kind differs
    /// from the map's declared kind.
    pub fn put(&mut self, address: Address, value: PropertyValue) -> StoreResult<Option<PropertyValue>> {
        if value.kind() != self.kind {
            return Err(StoreError::KindMismatch {
                map: self.name.clone(),
                expected: self.kind,
                actual: value.kind(),
            });
        }
        Ok(self.entries.insert(address, value))
    }

    /// Mark `address` in a void map.
    pub fn mark(&mut self, address: Address) -> StoreResult<()> {
        self.put(address, PropertyValue::Void).map(|_| ())
    }

    pub fn remove(&mut self, address: Address) -> Option<PropertyValue> {
        self.entries.remove(&address)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The first occupied address strictly after `from`.
    pub fn next_occupied(&self, from: Address) -> Option<Address> {
        self.entries
            .range((Bound::Excluded(from), Bound::Unbounded))
            .next()
            .map(|(a, _)| *a)
    }

    /// The last occupied address strictly before `from`.
    pub fn previous_occupied(&self, from: Address) -> Option<Address> {
        self.entries.range(..from).next_back().map(|(a, _)| *a)
    }

    /// Lazily enumerate occupied addresses at or after `cursor`, ascending.
    pub fn addresses_from(&self, cursor: Address) -> impl Iterator<Item = Address> + '_ {
        self.entries.range(cursor..).map(|(a, _)| *a)
    }

    /// All entries in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = (Address, &PropertyValue)> + '_ {
        self.entries.iter().map(|(a, v)| (*a, v))
    }

    /// All occupied addresses in ascending order.
    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.entries.keys().copied()
    }
}

/// Per-snapshot collection of property maps keyed by unique name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyMapManager {
    maps: BTreeMap<String, PropertyMap>,
}

impl PropertyMapManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty map. Fails if the name is taken.
    pub fn create_map(&mut self, name: &str, kind: ValueKind) -> StoreResult<&mut PropertyMap> {
        if self.maps.contains_key(name) {
            return Err(StoreError::DuplicateName {
                name: name.to_string(),
                scope: "property maps".into(),
            });
        }
        Ok(self
            .maps
            .entry(name.to_string())
            .or_insert_with(|| PropertyMap::new(name, kind)))
    }

    /// Fetch the map with this name, creating it if absent.
    ///
    /// Fails with [`StoreError::KindMismatch`] if the map exists with a
    /// different kind; a map's kind never changes after creation.
    pub fn get_or_create_map(&mut self, name: &str, kind: ValueKind) -> StoreResult<&mut PropertyMap> {
        let map = self
            .maps
            .entry(name.to_string())
            .or_insert_with(|| PropertyMap::new(name, kind));
        if map.kind() != kind {
            return Err(StoreError::KindMismatch {
                map: name.to_string(),
                expected: map.kind(),
                actual: kind,
            });
        }
        Ok(map)
    }

    pub fn get_map(&self, name: &str) -> Option<&PropertyMap> {
        self.maps.get(name)
    }

    pub fn get_map_mut(&mut self, name: &str) -> Option<&mut PropertyMap> {
        self.maps.get_mut(name)
    }

    /// Remove a map and all its entries. Returns the removed map.
    pub fn remove_map(&mut self, name: &str) -> Option<PropertyMap> {
        self.maps.remove(name)
    }

    /// Map names in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.maps.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyMap> + '_ {
        self.maps.values()
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}
