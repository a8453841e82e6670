//! Error types for the merge engine.
//!
//! Value and structural conflicts never surface here: they are answered by
//! the resolver. Only fatal conditions abort a merge.

use crate::transaction::TransactionState;

/// Errors that abort a merge transaction.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// Something the merge needs does not exist in any snapshot.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller or the resolver cancelled the merge.
    #[error("merge cancelled")]
    Cancelled,

    /// A resolver had no answer for a conflict it was asked about.
    #[error("no decision for {0}")]
    Unresolved(String),

    /// The transaction was driven out of order.
    #[error("invalid transaction state: cannot go from {from} to {to}")]
    InvalidState {
        from: TransactionState,
        to: TransactionState,
    },

    /// Configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] verso_store::StoreError),

    /// Diff operation failed.
    #[error("diff error: {0}")]
    Diff(#[from] verso_diff::DiffError),
}

/// Convenience alias for merge results.
pub type MergeResult<T> = Result<T, MergeError>;
