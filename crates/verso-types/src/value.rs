use std::fmt;

use serde::{Deserialize, Serialize};

/// The declared kind of a property map.
///
/// A map's kind is fixed when the map is created. Two snapshots that create
/// the same map name with different kinds produce a type conflict at merge
/// time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueKind {
    /// Marker maps: presence at an address is the whole value.
    Void,
    /// 32-bit signed integers.
    Int,
    /// 64-bit signed integers.
    Long,
    /// UTF-8 strings.
    String,
    /// Opaque structured objects.
    Object,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Void => "void",
            Self::Int => "int",
            Self::Long => "long",
            Self::String => "string",
            Self::Object => "object",
        };
        f.write_str(s)
    }
}

/// A single value stored at an address in a property map.
///
/// Values of different kinds never compare equal, so `Long(1)` and `Int(1)`
/// are different values. Opaque objects are carried as JSON documents and
/// compare structurally.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Void,
    Int(i32),
    Long(i64),
    String(String),
    Object(serde_json::Value),
}

impl PropertyValue {
    /// The kind this value belongs to.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Void => ValueKind::Void,
            Self::Int(_) => ValueKind::Int,
            Self::Long(_) => ValueKind::Long,
            Self::String(_) => ValueKind::String,
            Self::Object(_) => ValueKind::Object,
        }
    }

    /// Returns the integer payload for `Int` values.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the payload for `Long` values.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the payload for `String` values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the payload for `Object` values.
    pub fn as_object(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Object(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("<void>"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}L"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Object(v) => write!(f, "{v}"),
        }
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Object(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(PropertyValue::Void.kind(), ValueKind::Void);
        assert_eq!(PropertyValue::from(3).kind(), ValueKind::Int);
        assert_eq!(PropertyValue::from(3i64).kind(), ValueKind::Long);
        assert_eq!(PropertyValue::from("x").kind(), ValueKind::String);
        assert_eq!(PropertyValue::from(json!({"rgb": [0, 0, 0]})).kind(), ValueKind::Object);
    }

    #[test]
    fn different_kinds_never_equal() {
        assert_ne!(PropertyValue::Int(1), PropertyValue::Long(1));
        assert_ne!(PropertyValue::String("1".into()), PropertyValue::Int(1));
    }

    #[test]
    fn objects_compare_structurally() {
        let a = PropertyValue::from(json!({"r": 255, "g": 0, "b": 0}));
        let b = PropertyValue::from(json!({"b": 0, "g": 0, "r": 255}));
        assert_eq!(a, b);
    }

    #[test]
    fn accessors() {
        assert_eq!(PropertyValue::Int(2).as_int(), Some(2));
        assert_eq!(PropertyValue::Long(2).as_int(), None);
        assert_eq!(PropertyValue::Long(2).as_long(), Some(2));
        assert_eq!(PropertyValue::from("Six").as_str(), Some("Six"));
        assert!(PropertyValue::Void.as_object().is_none());
    }

    #[test]
    fn display_marks_longs() {
        assert_eq!(PropertyValue::Long(2).to_string(), "2L");
        assert_eq!(PropertyValue::Int(2).to_string(), "2");
        assert_eq!(ValueKind::String.to_string(), "string");
    }
}
