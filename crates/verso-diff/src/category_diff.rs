//! Category diff: compare two category trees by node identity.
//!
//! Nodes are matched by [`CategoryId`], never by path, so a rename or move
//! is reported as such rather than as a delete plus a create. Data types
//! are matched by (owning category id, name).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use verso_store::{CategoryTree, Placement};
use verso_types::{CategoryId, DataType};

/// How one node differs between the old and the new tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeChangeKind {
    Unchanged,
    /// Name changed, parent unchanged.
    Renamed,
    /// Parent changed, name unchanged.
    Moved,
    RenamedAndMoved,
    Created,
    Deleted,
}

/// Classify a node from its old and new placement.
///
/// Returns `None` when the node exists on neither side (created and deleted
/// again in between, which nets to nothing).
pub fn classify_node(old: Option<&Placement>, new: Option<&Placement>) -> Option<NodeChangeKind> {
    let kind = match (old, new) {
        (None, None) => return None,
        (None, Some(_)) => NodeChangeKind::Created,
        (Some(_), None) => NodeChangeKind::Deleted,
        (Some(o), Some(n)) => match (o.parent == n.parent, o.name == n.name) {
            (true, true) => NodeChangeKind::Unchanged,
            (true, false) => NodeChangeKind::Renamed,
            (false, true) => NodeChangeKind::Moved,
            (false, false) => NodeChangeKind::RenamedAndMoved,
        },
    };
    Some(kind)
}

/// A changed node with its placement on each side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeChange {
    pub kind: NodeChangeKind,
    pub old: Option<Placement>,
    pub new: Option<Placement>,
}

/// A change to one data type, keyed by owning category and name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataTypeChange {
    Added(DataType),
    Removed(DataType),
    Modified { old: DataType, new: DataType },
}

impl DataTypeChange {
    /// The data type on the new side, `None` if it was removed.
    pub fn new_value(&self) -> Option<&DataType> {
        match self {
            Self::Added(dt) | Self::Modified { new: dt, .. } => Some(dt),
            Self::Removed(_) => None,
        }
    }
}

/// The result of comparing two category trees.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CategoryDiff {
    /// Changed nodes by id. The root never appears.
    pub nodes: BTreeMap<CategoryId, NodeChange>,
    /// Changed data types by (category, name).
    pub data_types: BTreeMap<(CategoryId, String), DataTypeChange>,
}

impl CategoryDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.data_types.is_empty()
    }

    /// Total number of node and data-type changes.
    pub fn len(&self) -> usize {
        self.nodes.len() + self.data_types.len()
    }

    pub fn node(&self, id: CategoryId) -> Option<&NodeChange> {
        self.nodes.get(&id)
    }

    pub fn data_type(&self, category: CategoryId, name: &str) -> Option<&DataTypeChange> {
        self.data_types.get(&(category, name.to_string()))
    }

    /// Number of nodes changed in the given way.
    pub fn count(&self, kind: NodeChangeKind) -> usize {
        self.nodes.values().filter(|c| c.kind == kind).count()
    }
}

/// Compute the diff between two category trees.
pub fn diff_categories(old: &CategoryTree, new: &CategoryTree) -> CategoryDiff {
    let mut diff = CategoryDiff::new();

    // Old ids first, then ids that only exist in the new tree.
    let ids = old.ids().chain(new.ids().filter(|id| !old.contains(*id)));
    for id in ids {
        if id.is_root() {
            continue;
        }
        let before = old.placement(id);
        let after = new.placement(id);
        if let Some(kind) = classify_node(before.as_ref(), after.as_ref()) {
            if kind != NodeChangeKind::Unchanged {
                diff.nodes.insert(
                    id,
                    NodeChange {
                        kind,
                        old: before,
                        new: after,
                    },
                );
            }
        }
        diff_data_types(&mut diff, id, old, new);
    }
    diff_data_types(&mut diff, CategoryId::ROOT, old, new);

    diff
}

fn diff_data_types(diff: &mut CategoryDiff, id: CategoryId, old: &CategoryTree, new: &CategoryTree) {
    let old_types = old.get(id).into_iter().flat_map(|c| c.data_types());
    for dt in old_types {
        let change = match new.data_type(id, &dt.name) {
            Some(current) if current != dt => DataTypeChange::Modified {
                old: dt.clone(),
                new: current.clone(),
            },
            Some(_) => continue,
            None => DataTypeChange::Removed(dt.clone()),
        };
        diff.data_types.insert((id, dt.name.clone()), change);
    }

    let new_types = new.get(id).into_iter().flat_map(|c| c.data_types());
    for dt in new_types {
        if old.data_type(id, &dt.name).is_none() {
            diff.data_types
                .insert((id, dt.name.clone()), DataTypeChange::Added(dt.clone()));
        }
    }
}
