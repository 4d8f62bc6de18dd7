//! imview-core - Entity, type, and value model for hierarchical
//! scientific datasets
//!
//! This crate defines the backend-agnostic data model shared by all
//! imview providers:
//!
//! - **Entity**: path-addressed nodes of the dataset tree (groups,
//!   datasets, named datatypes, links)
//! - **DType**: semantic element types decoded from binary descriptors
//! - **Selection**: per-dimension index/range/full specifiers
//! - **Value**: self-describing fetched values (typed buffers or
//!   flattened structured data)
//! - **ImviewError**: the shared error taxonomy with machine-checkable
//!   kinds

pub mod dtype;
pub mod entity;
pub mod error;
pub mod selection;
pub mod value;

pub use dtype::{decode_dtype, CharSet, CompoundField, DType, Endianness, EnumMember, StrLength};
pub use entity::{
    build_entity_path, name_from_path, Attribute, Dataset, Entity, EntityContent, EntityKind,
};
pub use error::{ErrorKind, ImviewError, ImviewResult};
pub use selection::{DimSlice, Selection};
pub use value::{flatten_value, NumericArray, Value};
