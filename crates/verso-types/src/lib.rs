//! Foundation types for verso.
//!
//! This crate provides the value, identity and ordering types shared by the
//! store, diff and merge crates. Every other verso crate depends on
//! `verso-types`.
//!
//! # Key Types
//!
//! - [`Address`] -- Totally-ordered key in a linear address space
//! - [`ValueKind`] / [`PropertyValue`] -- Declared kind and value of a property map entry
//! - [`CategoryId`] -- Stable category identity that survives rename and move
//! - [`CategoryPath`] -- Name sequence from the root of a category tree
//! - [`DataType`] / [`DataShape`] -- Named data-type definitions owned by a category
//! - [`SnapshotId`] -- Content address of an encoded snapshot

pub mod address;
pub mod category;
pub mod data_type;
pub mod error;
pub mod object;
pub mod value;

pub use address::Address;
pub use category::{CategoryId, CategoryPath};
pub use data_type::{DataShape, DataType, Field};
pub use error::TypeError;
pub use object::SnapshotId;
pub use value::{PropertyValue, ValueKind};
