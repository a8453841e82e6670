//! Whole-snapshot diff: every property map plus the category tree.

use std::collections::BTreeMap;

use tracing::debug;
use verso_store::{Snapshot, SnapshotStore};
use verso_types::SnapshotId;

use crate::category_diff::{diff_categories, CategoryDiff};
use crate::error::{DiffError, DiffResult};
use crate::property_diff::{diff_property_maps, PropertyMapDiff};

/// The result of comparing two snapshots.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SnapshotDiff {
    /// Diffs of the maps that changed, by name. Unchanged maps are omitted.
    pub maps: BTreeMap<String, PropertyMapDiff>,
    pub categories: CategoryDiff,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty() && self.categories.is_empty()
    }

    /// The diff of one map; empty if the map did not change.
    pub fn map(&self, name: &str) -> Option<&PropertyMapDiff> {
        self.maps.get(name)
    }
}

/// Compare two in-memory snapshots.
pub fn diff_snapshots(old: &Snapshot, new: &Snapshot) -> SnapshotDiff {
    let mut maps = BTreeMap::new();
    let names = old
        .properties
        .names()
        .chain(new.properties.names().filter(|n| old.properties.get_map(n).is_none()));
    for name in names {
        let diff = diff_property_maps(old.properties.get_map(name), new.properties.get_map(name));
        if !diff.is_empty() {
            maps.insert(name.to_string(), diff);
        }
    }

    SnapshotDiff {
        maps,
        categories: diff_categories(&old.categories, &new.categories),
    }
}

/// Compare two snapshots read from a store.
pub fn diff_stored(store: &dyn SnapshotStore, old: &SnapshotId, new: &SnapshotId) -> DiffResult<SnapshotDiff> {
    let old_snap = store.read(old)?.ok_or(DiffError::SnapshotNotFound(*old))?;
    let new_snap = store.read(new)?.ok_or(DiffError::SnapshotNotFound(*new))?;
    let diff = diff_snapshots(&old_snap, &new_snap);
    debug!(
        old = %old.short_hex(),
        new = %new.short_hex(),
        maps = diff.maps.len(),
        categories = diff.categories.len(),
        "diffed stored snapshots"
    );
    Ok(diff)
}
