//! Property-map diff: compare two versions of one named map.
//!
//! Either side may be absent (the map does not exist in that snapshot). An
//! absent map diffs like an empty one, so removing a whole map shows up as
//! one `Removed` change per entry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use verso_store::PropertyMap;
use verso_types::{Address, PropertyValue, ValueKind};

/// The result of comparing two versions of a property map.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyMapDiff {
    /// Declared kind on the old side, `None` if the map was absent.
    pub old_kind: Option<ValueKind>,
    /// Declared kind on the new side, `None` if the map is absent.
    pub new_kind: Option<ValueKind>,
    /// Per-address changes, keyed by address.
    pub changes: BTreeMap<Address, AddressChange>,
}

impl PropertyMapDiff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the entries and the map's presence are unchanged.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.old_kind == self.new_kind
    }

    /// Number of changed addresses.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn get(&self, address: Address) -> Option<&AddressChange> {
        self.changes.get(&address)
    }

    /// Changed addresses in ascending order.
    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.changes.keys().copied()
    }

    /// The map exists on the new side but not the old.
    pub fn map_created(&self) -> bool {
        self.old_kind.is_none() && self.new_kind.is_some()
    }

    /// The map existed on the old side and is gone on the new.
    pub fn map_removed(&self) -> bool {
        self.old_kind.is_some() && self.new_kind.is_none()
    }

    /// Both sides hold the map with different declared kinds.
    pub fn kind_changed(&self) -> bool {
        matches!((self.old_kind, self.new_kind), (Some(a), Some(b)) if a != b)
    }

    /// Number of added addresses.
    pub fn additions(&self) -> usize {
        self.changes
            .values()
            .filter(|c| matches!(c, AddressChange::Added { .. }))
            .count()
    }

    /// Number of removed addresses.
    pub fn removals(&self) -> usize {
        self.changes
            .values()
            .filter(|c| matches!(c, AddressChange::Removed { .. }))
            .count()
    }

    /// Number of addresses whose value changed.
    pub fn modifications(&self) -> usize {
        self.changes
            .values()
            .filter(|c| matches!(c, AddressChange::Modified { .. }))
            .count()
    }
}

/// A single change at one address.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AddressChange {
    /// A value appeared where there was none.
    Added { value: PropertyValue },
    /// The value at this address went away.
    Removed { value: PropertyValue },
    /// The value was replaced.
    Modified { old: PropertyValue, new: PropertyValue },
}

impl AddressChange {
    /// The value on the new side, `None` if it was removed.
    pub fn new_value(&self) -> Option<&PropertyValue> {
        match self {
            Self::Added { value } => Some(value),
            Self::Removed { .. } => None,
            Self::Modified { new, .. } => Some(new),
        }
    }

    /// The value on the old side, `None` if it was added.
    pub fn old_value(&self) -> Option<&PropertyValue> {
        match self {
            Self::Added { .. } => None,
            Self::Removed { value } => Some(value),
            Self::Modified { old, .. } => Some(old),
        }
    }
}

/// Compute the diff between two versions of a property map.
///
/// Addresses present only in `new` are `Added`, addresses present only in
/// `old` are `Removed`, and addresses present in both with different values
/// are `Modified`. Values of different kinds always compare unequal.
pub fn diff_property_maps(old: Option<&PropertyMap>, new: Option<&PropertyMap>) -> PropertyMapDiff {
    let mut changes = BTreeMap::new();

    if let Some(old) = old {
        for (address, old_val) in old.iter() {
            match new.and_then(|n| n.get(address)) {
                Some(new_val) if new_val != old_val => {
                    changes.insert(
                        address,
                        AddressChange::Modified {
                            old: old_val.clone(),
                            new: new_val.clone(),
                        },
                    );
                }
                Some(_) => {}
                None => {
                    changes.insert(address, AddressChange::Removed { value: old_val.clone() });
                }
            }
        }
    }

    if let Some(new) = new {
        for (address, new_val) in new.iter() {
            if !old.is_some_and(|o| o.contains(address)) {
                changes.insert(address, AddressChange::Added { value: new_val.clone() });
            }
        }
    }

    PropertyMapDiff {
        old_kind: old.map(PropertyMap::kind),
        new_kind: new.map(PropertyMap::kind),
        changes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::from_hex(s).unwrap()
    }

    fn int_map(entries: &[(&str, i32)]) -> PropertyMap {
        let mut map = PropertyMap::new("Space", ValueKind::Int);
        for (a, v) in entries {
            map.put(addr(a), PropertyValue::Int(*v)).unwrap();
        }
        map
    }

    #[test]
    fn identical_maps_produce_empty_diff() {
        let map = int_map(&[("0x10018ae", 1), ("0x10018ba", 2)]);
        let diff = diff_property_maps(Some(&map), Some(&map));
        assert!(diff.is_empty());
    }

    #[test]
    fn detects_added_removed_modified() {
        let old = int_map(&[("0x10018ae", 1), ("0x10018ba", 2)]);
        let new = int_map(&[("0x10018ba", 3), ("0x10018ce", 4)]);
        let diff = diff_property_maps(Some(&old), Some(&new));

        assert_eq!(diff.len(), 3);
        assert_eq!(diff.additions(), 1);
        assert_eq!(diff.removals(), 1);
        assert_eq!(diff.modifications(), 1);
        assert_eq!(
            diff.get(addr("0x10018ba")),
            Some(&AddressChange::Modified {
                old: PropertyValue::Int(2),
                new: PropertyValue::Int(3)
            })
        );
        assert_eq!(diff.get(addr("0x10018ae")).unwrap().new_value(), None);
    }

    #[test]
    fn changes_are_in_address_order() {
        let new = int_map(&[("0x30", 1), ("0x10", 1), ("0x20", 1)]);
        let diff = diff_property_maps(None, Some(&new));
        let order: Vec<_> = diff.addresses().collect();
        assert_eq!(order, vec![addr("0x10"), addr("0x20"), addr("0x30")]);
    }

    #[test]
    fn removed_map_removes_every_entry() {
        let old = int_map(&[("0x10", 1), ("0x20", 2)]);
        let diff = diff_property_maps(Some(&old), None);
        assert!(diff.map_removed());
        assert_eq!(diff.removals(), 2);
    }

    #[test]
    fn removed_empty_map_is_still_a_change() {
        let old = PropertyMap::new("empty", ValueKind::Void);
        let diff = diff_property_maps(Some(&old), None);
        assert!(diff.map_removed());
        assert!(!diff.is_empty());
        assert_eq!(diff.len(), 0);
    }

    #[test]
    fn kind_change_makes_values_unequal() {
        let mut old = PropertyMap::new("testMap", ValueKind::String);
        old.put(addr("0x1001000"), "String0".into()).unwrap();
        let mut new = PropertyMap::new("testMap", ValueKind::Long);
        new.put(addr("0x1001000"), PropertyValue::Long(0)).unwrap();

        let diff = diff_property_maps(Some(&old), Some(&new));
        assert!(diff.kind_changed());
        assert!(matches!(
            diff.get(addr("0x1001000")),
            Some(AddressChange::Modified { .. })
        ));
    }

    #[test]
    fn object_values_compare_structurally() {
        let mut old = PropertyMap::new("testColor", ValueKind::Object);
        old.put(addr("0x100248c"), serde_json::json!({"rgb": [0, 0, 255]}).into())
            .unwrap();
        let mut new = old.clone();
        new.put(addr("0x100248c"), serde_json::json!({"rgb": [0, 0, 255]}).into())
            .unwrap();
        assert!(diff_property_maps(Some(&old), Some(&new)).is_empty());
    }
}
