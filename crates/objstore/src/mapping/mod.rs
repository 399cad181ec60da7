//! Type descriptors, field mappings and SQL generation.
//!
//! - [`ObjectType`]: declared accessor surface of a storable type
//! - [`FieldMapping`]: sorted, indexed field schema resolved from it
//! - [`TableMapping`]: dialect-specific statement text for one type
//! - [`MappingRegistry`]: the per-storage cache of both

pub mod field;
pub mod object_type;
pub mod registry;
pub mod table;

pub use field::FieldMapping;
pub use object_type::{Accessor, ObjectType};
pub use registry::MappingRegistry;
pub use table::{Statement, TableMapping};
