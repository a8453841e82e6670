//! Error types for the diff crate.

use verso_types::SnapshotId;

/// Errors that can occur during diff operations.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// A snapshot referenced during diff was not found in the store.
    #[error("snapshot not found: {0:?}")]
    SnapshotNotFound(SnapshotId),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] verso_store::StoreError),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
