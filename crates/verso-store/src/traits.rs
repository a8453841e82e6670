use verso_types::SnapshotId;

use crate::error::StoreResult;
use crate::snapshot::Snapshot;

/// Storage boundary for snapshots.
///
/// The merge engine only ever reads its three inputs and writes one Result.
/// Implementations must satisfy these invariants:
/// - Snapshots are immutable once written; the id is derived from content,
///   so writing the same snapshot twice is a no-op returning the same id.
/// - Reads hand out independent copies. Mutating a read snapshot never
///   affects the stored one.
/// - Concurrent reads are always safe.
pub trait SnapshotStore: Send + Sync {
    /// Read a snapshot by id. Returns `Ok(None)` if it does not exist.
    fn read(&self, id: &SnapshotId) -> StoreResult<Option<Snapshot>>;

    /// Write a snapshot and return its content id.
    fn write(&self, snapshot: &Snapshot) -> StoreResult<SnapshotId>;

    /// Check whether a snapshot exists.
    fn exists(&self, id: &SnapshotId) -> StoreResult<bool>;

    /// Delete a snapshot. Returns `true` if it existed.
    fn delete(&self, id: &SnapshotId) -> StoreResult<bool>;
}
