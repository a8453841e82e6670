use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

/// Stable identity of a category node.
///
/// A `CategoryId` is assigned when a category is created and never changes,
/// no matter how often the category is renamed or moved. Snapshots derived
/// from a common ancestor share ids for the nodes they inherited, which is
/// what lets the merge engine recognise "the same category" under a new path.
///
/// Ids are UUID v7 so independently created nodes in different snapshots
/// never collide. The root category always has the nil id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryId(Uuid);

impl CategoryId {
    /// The id of every tree's root category.
    pub const ROOT: Self = Self(Uuid::nil());

    /// Allocate a fresh id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns `true` for the root id.
    pub fn is_root(&self) -> bool {
        self.0.is_nil()
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Short identifier (first 8 hex characters).
    pub fn short_id(&self) -> String {
        hex::encode(&self.0.as_bytes()[..4])
    }
}

impl fmt::Debug for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "CategoryId(root)")
        } else {
            write!(f, "CategoryId({})", self.0)
        }
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Check that `name` is usable as a category or data-type name.
pub fn validate_name(name: &str) -> Result<(), TypeError> {
    if name.is_empty() || name.contains('/') || name.trim() != name {
        return Err(TypeError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Path of a category from the root, e.g. `/Category1/Category2`.
///
/// Paths are for lookup and display only. Two snapshots may give the same
/// node different paths; node identity is carried by [`CategoryId`].
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct CategoryPath {
    components: Vec<String>,
}

impl CategoryPath {
    /// The root path `/`.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from components, validating each name.
    pub fn from_components<I, S>(components: I) -> Result<Self, TypeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let components: Vec<String> = components.into_iter().map(Into::into).collect();
        for c in &components {
            validate_name(c).map_err(|_| TypeError::InvalidPath(format!("bad component {c:?}")))?;
        }
        Ok(Self { components })
    }

    /// Parse an absolute path such as `/MISC` or `/Category1/Category2`.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let rest = s
            .strip_prefix('/')
            .ok_or_else(|| TypeError::InvalidPath(format!("{s:?} is not absolute")))?;
        if rest.is_empty() {
            return Ok(Self::root());
        }
        Self::from_components(rest.split('/'))
            .map_err(|_| TypeError::InvalidPath(s.to_string()))
    }

    /// Returns `true` for `/`.
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// The last component, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    /// The parent path, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            components: self.components[..self.components.len() - 1].to_vec(),
        })
    }

    /// Append a child component.
    pub fn child(&self, name: &str) -> Result<Self, TypeError> {
        validate_name(name)?;
        let mut components = self.components.clone();
        components.push(name.to_string());
        Ok(Self { components })
    }

    /// The path components, root first.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Number of components.
    pub fn depth(&self) -> usize {
        self.components.len()
    }
}

impl fmt::Debug for CategoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CategoryPath({self})")
    }
}

impl fmt::Display for CategoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "/");
        }
        for c in &self.components {
            write!(f, "/{c}")?;
        }
        Ok(())
    }
}

impl FromStr for CategoryPath {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
