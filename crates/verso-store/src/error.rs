use verso_types::{CategoryId, TypeError, ValueKind};

/// Errors from snapshot model and storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No category with this id exists in the tree.
    #[error("category not found: {0:?}")]
    CategoryNotFound(CategoryId),

    /// A sibling (or map, or data type) with this name already exists.
    #[error("duplicate name {name:?} in {scope}")]
    DuplicateName { name: String, scope: String },

    /// A value or map of the wrong kind was supplied.
    #[error("kind mismatch for {map:?}: map holds {expected}, got {actual}")]
    KindMismatch {
        map: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    /// Moving a category beneath itself or one of its descendants.
    #[error("moving {node:?} under {dest:?} would create a cycle")]
    Cycle { node: CategoryId, dest: CategoryId },

    /// The root category cannot be renamed, moved or removed.
    #[error("operation not permitted on the root category")]
    RootImmutable,

    /// A snapshot violates a structural invariant.
    #[error("corrupt snapshot: {0}")]
    Corrupt(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An invalid name, path or address.
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
