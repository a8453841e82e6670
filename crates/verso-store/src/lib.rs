//! Snapshot model and storage for verso.
//!
//! A [`Snapshot`] is the full metadata state of one program version: a
//! [`CategoryTree`] of categories and data types, and a
//! [`PropertyMapManager`] of user-defined address-keyed property maps. The
//! merge engine reads three snapshots and produces a fourth.
//!
//! # Storage Backends
//!
//! All backends implement the [`SnapshotStore`] trait:
//!
//! - [`InMemorySnapshotStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Snapshots at rest always satisfy [`Snapshot::validate`].
//! 2. Category identity is the [`CategoryId`](verso_types::CategoryId), never the path.
//! 3. A property map's kind never changes after creation.
//! 4. Stored snapshots are immutable and content-addressed.

pub mod category;
pub mod error;
pub mod memory;
pub mod property;
pub mod snapshot;
pub mod traits;

pub use category::{
    unique_name, Category, CategoryTree, DataTypeAdded, DataTypeConflictHandler, Placement,
    CONFLICT_SUFFIX,
};
pub use error::{StoreError, StoreResult};
pub use memory::InMemorySnapshotStore;
pub use property::{PropertyMap, PropertyMapManager};
pub use snapshot::{Snapshot, SnapshotRole};
pub use traits::SnapshotStore;
