//! Two-way diff engine for verso snapshots.
//!
//! Compares an older and a newer snapshot and produces structured change
//! sets. The merge engine diffs Latest and Mine against Original and
//! classifies each unit from the pair of change sets.
//!
//! # Key Types
//!
//! - [`PropertyMapDiff`] / [`AddressChange`] -- per-address changes of one property map
//! - [`CategoryDiff`] / [`NodeChange`] / [`DataTypeChange`] -- category placements and data types
//! - [`SnapshotDiff`] -- both of the above for a whole snapshot

pub mod category_diff;
pub mod error;
pub mod property_diff;
pub mod snapshot_diff;

pub use category_diff::{classify_node, diff_categories, CategoryDiff, DataTypeChange, NodeChange, NodeChangeKind};
pub use error::{DiffError, DiffResult};
pub use property_diff::{diff_property_maps, AddressChange, PropertyMapDiff};
pub use snapshot_diff::{diff_snapshots, diff_stored, SnapshotDiff};
