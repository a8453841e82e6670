use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;
use verso_types::SnapshotId;

use crate::error::StoreResult;
use crate::snapshot::Snapshot;
use crate::traits::SnapshotStore;

/// In-memory, HashMap-based snapshot store.
///
/// Snapshots are held in their canonical encoding behind a `RwLock`, so every
/// read decodes a fresh copy and nothing a caller does to it can leak back
/// into the store.
pub struct InMemorySnapshotStore {
    snapshots: RwLock<HashMap<SnapshotId, Vec<u8>>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self {
            snapshots: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored snapshots.
    pub fn len(&self) -> usize {
        self.snapshots.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.read().expect("lock poisoned").is_empty()
    }

    /// Sorted list of all stored ids.
    pub fn all_ids(&self) -> Vec<SnapshotId> {
        let map = self.snapshots.read().expect("lock poisoned");
        let mut ids: Vec<SnapshotId> = map.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl Default for InMemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn read(&self, id: &SnapshotId) -> StoreResult<Option<Snapshot>> {
        let map = self.snapshots.read().expect("lock poisoned");
        map.get(id).map(|bytes| Snapshot::decode(bytes)).transpose()
    }

    fn write(&self, snapshot: &Snapshot) -> StoreResult<SnapshotId> {
        snapshot.validate()?;
        let bytes = snapshot.encode()?;
        let id = SnapshotId::for_encoding(&bytes);
        let mut map = self.snapshots.write().expect("lock poisoned");
        map.entry(id).or_insert(bytes);
        debug!(id = %id.short_hex(), "snapshot stored");
        Ok(id)
    }

    fn exists(&self, id: &SnapshotId) -> StoreResult<bool> {
        Ok(self.snapshots.read().expect("lock poisoned").contains_key(id))
    }

    fn delete(&self, id: &SnapshotId) -> StoreResult<bool> {
        Ok(self.snapshots.write().expect("lock poisoned").remove(id).is_some())
    }
}

impl std::fmt::Debug for InMemorySnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySnapshotStore")
            .field("snapshot_count", &self.len())
            .finish()
    }
}
