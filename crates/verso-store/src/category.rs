//! Arena-backed category tree.
//!
//! Nodes are keyed by [`CategoryId`] and carry an explicit parent pointer plus
//! a child set. Paths are derived on demand; nothing in the tree is keyed by
//! path, so renames and moves never invalidate identities.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;
use verso_types::category::validate_name;
use verso_types::{CategoryId, CategoryPath, DataType};

use crate::error::{StoreError, StoreResult};

/// Default suffix used when disambiguating colliding names.
pub const CONFLICT_SUFFIX: &str = ".conflict";

/// Pick the first free name among `base`, then `base{suffix}`,
/// `base{suffix}1`, `base{suffix}2`, ...
///
/// `base` itself is only returned when it is free.
pub fn unique_name(base: &str, suffix: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(base) {
        return base.to_string();
    }
    let first = format!("{base}{suffix}");
    if !is_taken(&first) {
        return first;
    }
    (1u32..)
        .map(|n| format!("{base}{suffix}{n}"))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or(first)
}

/// Policy applied when a data type lands in a category that already holds a
/// data type of the same name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataTypeConflictHandler {
    /// Reuse the existing type when the shapes match, otherwise add the
    /// incoming type under a disambiguated name.
    #[default]
    ReuseOrRename,
    /// Keep the existing type and discard the incoming one.
    KeepExisting,
    /// Replace the existing type with the incoming one.
    ReplaceExisting,
}

/// What [`CategoryTree::add_data_type`] did with the incoming type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataTypeAdded {
    /// No collision; stored under its own name.
    Added(String),
    /// An equivalent type already existed and was reused.
    Reused(String),
    /// Stored under a new name to avoid a collision.
    Renamed { from: String, to: String },
    /// The existing type was overwritten.
    Replaced(String),
    /// The existing type was kept; the incoming one was dropped.
    KeptExisting(String),
}

impl DataTypeAdded {
    /// The name under which the category now holds the type.
    pub fn name(&self) -> &str {
        match self {
            Self::Added(n) | Self::Reused(n) | Self::Replaced(n) | Self::KeptExisting(n) => n,
            Self::Renamed { to, .. } => to,
        }
    }
}

/// Where a category sits: its parent and its name under that parent.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub parent: CategoryId,
    pub name: String,
}

impl Placement {
    pub fn new(parent: CategoryId, name: impl Into<String>) -> Self {
        Self {
            parent,
            name: name.into(),
        }
    }
}

/// A node in the category tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    id: CategoryId,
    name: String,
    parent: Option<CategoryId>,
    children: BTreeSet<CategoryId>,
    data_types: BTreeMap<String, DataType>,
}

impl Category {
    fn new(id: CategoryId, name: String, parent: Option<CategoryId>) -> Self {
        Self {
            id,
            name,
            parent,
            children: BTreeSet::new(),
            data_types: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> CategoryId {
        self.id
    }

    /// The node's name; empty for the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent id; `None` only for the root.
    pub fn parent(&self) -> Option<CategoryId> {
        self.parent
    }

    pub fn child_ids(&self) -> impl Iterator<Item = CategoryId> + '_ {
        self.children.iter().copied()
    }

    pub fn data_type(&self, name: &str) -> Option<&DataType> {
        self.data_types.get(name)
    }

    /// Data types held by this category, ordered by name.
    pub fn data_types(&self) -> impl Iterator<Item = &DataType> + '_ {
        self.data_types.values()
    }
}

/// A rooted tree of categories.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryTree {
    nodes: BTreeMap<CategoryId, Category>,
}

impl Default for CategoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryTree {
    /// A tree holding only the root category.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            CategoryId::ROOT,
            Category::new(CategoryId::ROOT, String::new(), None),
        );
        Self { nodes }
    }

    pub fn root(&self) -> &Category {
        &self.nodes[&CategoryId::ROOT]
    }

    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of categories including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`; a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All category ids, root included, in id order.
    pub fn ids(&self) -> impl Iterator<Item = CategoryId> + '_ {
        self.nodes.keys().copied()
    }

    /// Parent and name of `id`; `None` for the root or a missing id.
    pub fn placement(&self, id: CategoryId) -> Option<Placement> {
        let node = self.nodes.get(&id)?;
        Some(Placement::new(node.parent?, node.name.clone()))
    }

    fn node(&self, id: CategoryId) -> StoreResult<&Category> {
        self.nodes.get(&id).ok_or(StoreError::CategoryNotFound(id))
    }

    fn node_mut(&mut self, id: CategoryId) -> StoreResult<&mut Category> {
        self.nodes.get_mut(&id).ok_or(StoreError::CategoryNotFound(id))
    }

    /// The child of `parent` called `name`.
    pub fn child_named(&self, parent: CategoryId, name: &str) -> Option<CategoryId> {
        self.nodes
            .get(&parent)?
            .children
            .iter()
            .copied()
            .find(|c| self.nodes.get(c).is_some_and(|n| n.name == name))
    }

    /// Children of `id`, ordered by name.
    pub fn children(&self, id: CategoryId) -> Vec<&Category> {
        let mut out: Vec<&Category> = self
            .nodes
            .get(&id)
            .map(|n| n.children.iter().filter_map(|c| self.nodes.get(c)).collect())
            .unwrap_or_default();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    pub fn get_by_path(&self, path: &CategoryPath) -> Option<&Category> {
        let mut current = CategoryId::ROOT;
        for component in path.components() {
            current = self.child_named(current, component)?;
        }
        self.nodes.get(&current)
    }

    pub fn contains_path(&self, path: &CategoryPath) -> bool {
        self.get_by_path(path).is_some()
    }

    /// The current path of `id`.
    pub fn path_of(&self, id: CategoryId) -> Option<CategoryPath> {
        let mut names = Vec::new();
        let mut current = self.nodes.get(&id)?;
        while let Some(parent) = current.parent {
            names.push(current.name.clone());
            current = self.nodes.get(&parent)?;
            if names.len() > self.nodes.len() {
                return None;
            }
        }
        names.reverse();
        CategoryPath::from_components(names).ok()
    }

    /// Returns `true` if `ancestor` is `id` or lies above it.
    pub fn is_ancestor_or_self(&self, ancestor: CategoryId, id: CategoryId) -> bool {
        let mut current = Some(id);
        let mut steps = 0;
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                return false;
            }
            current = self.nodes.get(&c).and_then(|n| n.parent);
        }
        false
    }

    /// Create every missing category along `path` and return the id of the
    /// last one. Existing categories are left untouched.
    pub fn create_category(&mut self, path: &CategoryPath) -> StoreResult<CategoryId> {
        let mut current = CategoryId::ROOT;
        for component in path.components() {
            current = match self.child_named(current, component) {
                Some(existing) => existing,
                None => self.create_child(current, component)?,
            };
        }
        Ok(current)
    }

    /// Create a new child category with a fresh id.
    pub fn create_child(&mut self, parent: CategoryId, name: &str) -> StoreResult<CategoryId> {
        let id = CategoryId::generate();
        self.insert_category(id, parent, name)?;
        Ok(id)
    }

    /// Insert a category with a known id.
    ///
    /// Used when replaying another snapshot's node into this tree; the id must
    /// not already exist here.
    pub fn insert_category(&mut self, id: CategoryId, parent: CategoryId, name: &str) -> StoreResult<()> {
        validate_name(name)?;
        if self.nodes.contains_key(&id) {
            return Err(StoreError::Corrupt(format!("category {id:?} already present")));
        }
        self.ensure_name_free(parent, name, None)?;
        self.node_mut(parent)?.children.insert(id);
        self.nodes
            .insert(id, Category::new(id, name.to_string(), Some(parent)));
        debug!(id = %id, parent = %parent, name, "category inserted");
        Ok(())
    }

    fn ensure_name_free(&self, parent: CategoryId, name: &str, except: Option<CategoryId>) -> StoreResult<()> {
        match self.child_named(parent, name) {
            Some(existing) if Some(existing) != except => Err(StoreError::DuplicateName {
                name: name.to_string(),
                scope: self
                    .path_of(parent)
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| format!("{parent:?}")),
            }),
            _ => {
                self.node(parent)?;
                Ok(())
            }
        }
    }

    pub fn rename_category(&mut self, id: CategoryId, new_name: &str) -> StoreResult<()> {
        if id.is_root() {
            return Err(StoreError::RootImmutable);
        }
        validate_name(new_name)?;
        let parent = self.node(id)?.parent.ok_or(StoreError::RootImmutable)?;
        self.ensure_name_free(parent, new_name, Some(id))?;
        self.node_mut(id)?.name = new_name.to_string();
        Ok(())
    }

    /// Re-parent `id` under `dest`, keeping its name and subtree.
    pub fn move_category(&mut self, id: CategoryId, dest: CategoryId) -> StoreResult<()> {
        if id.is_root() {
            return Err(StoreError::RootImmutable);
        }
        let (name, old_parent) = {
            let node = self.node(id)?;
            (node.name.clone(), node.parent.ok_or(StoreError::RootImmutable)?)
        };
        self.node(dest)?;
        if self.is_ancestor_or_self(id, dest) {
            return Err(StoreError::Cycle { node: id, dest });
        }
        if old_parent == dest {
            return Ok(());
        }
        self.ensure_name_free(dest, &name, Some(id))?;
        self.node_mut(old_parent)?.children.remove(&id);
        self.node_mut(dest)?.children.insert(id);
        self.node_mut(id)?.parent = Some(dest);
        Ok(())
    }

    /// Remove `id` and its whole subtree. Returns the removed ids, `id` first.
    pub fn remove_category(&mut self, id: CategoryId) -> StoreResult<Vec<CategoryId>> {
        if id.is_root() {
            return Err(StoreError::RootImmutable);
        }
        let parent = self.node(id)?.parent.ok_or(StoreError::RootImmutable)?;
        self.node_mut(parent)?.children.remove(&id);

        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                stack.extend(node.children.iter().copied());
                removed.push(current);
            }
        }
        Ok(removed)
    }

    // ---- data types ----

    pub fn data_type(&self, category: CategoryId, name: &str) -> Option<&DataType> {
        self.nodes.get(&category)?.data_types.get(name)
    }

    /// Store `dt` in `category`, overwriting any type of the same name.
    pub fn put_data_type(&mut self, category: CategoryId, dt: DataType) -> StoreResult<Option<DataType>> {
        validate_name(&dt.name)?;
        let node = self.node_mut(category)?;
        Ok(node.data_types.insert(dt.name.clone(), dt))
    }

    pub fn remove_data_type(&mut self, category: CategoryId, name: &str) -> StoreResult<Option<DataType>> {
        Ok(self.node_mut(category)?.data_types.remove(name))
    }

    /// Add `dt` to `category`, applying `handler` if the name is taken.
    pub fn add_data_type(
        &mut self,
        category: CategoryId,
        dt: DataType,
        handler: DataTypeConflictHandler,
        suffix: &str,
    ) -> StoreResult<DataTypeAdded> {
        validate_name(&dt.name)?;
        let node = self.node_mut(category)?;
        let Some(existing) = node.data_types.get(&dt.name).cloned() else {
            let name = dt.name.clone();
            node.data_types.insert(name.clone(), dt);
            return Ok(DataTypeAdded::Added(name));
        };

        let outcome = match handler {
            DataTypeConflictHandler::KeepExisting => DataTypeAdded::KeptExisting(dt.name),
            DataTypeConflictHandler::ReplaceExisting => {
                let name = dt.name.clone();
                node.data_types.insert(name.clone(), dt);
                DataTypeAdded::Replaced(name)
            }
            DataTypeConflictHandler::ReuseOrRename if existing.is_equivalent(&dt) => {
                DataTypeAdded::Reused(dt.name)
            }
            DataTypeConflictHandler::ReuseOrRename => {
                let taken = &node.data_types;
                let to = unique_name(&dt.name, suffix, |n| taken.contains_key(n));
                let from = dt.name.clone();
                node.data_types.insert(to.clone(), dt.renamed(to.clone()));
                DataTypeAdded::Renamed { from, to }
            }
        };
        Ok(outcome)
    }

    /// Check parent/child consistency, sibling-name uniqueness and
    /// reachability from the root.
    pub fn validate(&self) -> StoreResult<()> {
        let root = self
            .nodes
            .get(&CategoryId::ROOT)
            .ok_or_else(|| StoreError::Corrupt("missing root category".into()))?;
        if root.parent.is_some() {
            return Err(StoreError::Corrupt("root category has a parent".into()));
        }

        for (id, node) in &self.nodes {
            if let Some(parent) = node.parent {
                let p = self.nodes.get(&parent).ok_or_else(|| {
                    StoreError::Corrupt(format!("{id:?} points at missing parent {parent:?}"))
                })?;
                if !p.children.contains(id) {
                    return Err(StoreError::Corrupt(format!(
                        "{parent:?} does not list child {id:?}"
                    )));
                }
            } else if !id.is_root() {
                return Err(StoreError::Corrupt(format!("{id:?} has no parent")));
            }

            let mut names = BTreeSet::new();
            for child in &node.children {
                let c = self.nodes.get(child).ok_or_else(|| {
                    StoreError::Corrupt(format!("{id:?} lists missing child {child:?}"))
                })?;
                if c.parent != Some(*id) {
                    return Err(StoreError::Corrupt(format!(
                        "{child:?} is listed under {id:?} but points elsewhere"
                    )));
                }
                if !names.insert(c.name.as_str()) {
                    return Err(StoreError::Corrupt(format!(
                        "duplicate sibling name {:?} under {id:?}",
                        c.name
                    )));
                }
            }

            for (key, dt) in &node.data_types {
                if *key != dt.name {
                    return Err(StoreError::Corrupt(format!(
                        "data type {:?} filed under {key:?}",
                        dt.name
                    )));
                }
            }

            if self.path_of(*id).is_none() {
                return Err(StoreError::Corrupt(format!("{id:?} is not reachable from the root")));
            }
        }
        Ok(())
    }
}
