use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One component of a structure.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    /// Name of the component's data type, e.g. `"byte"` or `"float"`.
    pub type_name: String,
    pub size: u32,
}

impl Field {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, size: u32) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            size,
        }
    }
}

/// The layout of a data type, independent of its name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataShape {
    /// A primitive of fixed size (byte, word, float, ...).
    Builtin { size: u32 },
    /// An ordered list of fields.
    Structure { fields: Vec<Field> },
    /// An alias for another named type.
    Typedef { target: String },
    /// Named integer constants of a fixed storage size.
    Enumeration {
        size: u32,
        values: BTreeMap<String, i64>,
    },
}

impl DataShape {
    /// Storage size in bytes, if it can be known without resolving other types.
    pub fn size(&self) -> Option<u32> {
        match self {
            Self::Builtin { size } | Self::Enumeration { size, .. } => Some(*size),
            Self::Structure { fields } => Some(fields.iter().map(|f| f.size).sum()),
            Self::Typedef { .. } => None,
        }
    }
}

/// A named data-type definition owned by exactly one category.
///
/// Within a category, data types are unique by name. Two definitions with the
/// same name are *equivalent* when their shapes match; the merge engine reuses
/// an equivalent definition instead of adding a duplicate.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataType {
    pub name: String,
    pub shape: DataShape,
}

impl DataType {
    pub fn new(name: impl Into<String>, shape: DataShape) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }

    /// Convenience constructor for a structure.
    pub fn structure(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self::new(name, DataShape::Structure { fields })
    }

    /// Returns `true` if `other` has the same shape, regardless of name.
    pub fn is_equivalent(&self, other: &DataType) -> bool {
        self.shape == other.shape
    }

    /// A copy of this definition under a different name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shape: self.shape.clone(),
        }
    }
}
