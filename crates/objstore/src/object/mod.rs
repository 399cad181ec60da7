//! Object representation.
//!
//! - [`StoredObject`]: read-only view over a key and a value array
//! - [`ObjectBuilder`]: mutable overlay, finalized once
//! - [`ObjectBuilderFactory`]: the construction modes for builders
//! - [`ObjectFactory`]: materialization of result rows
//! - [`Storable`] / [`AsObject`]: typed domain views

pub mod builder;
pub mod factory;
pub mod materialize;
pub mod stored;

pub use builder::ObjectBuilder;
pub use factory::ObjectBuilderFactory;
pub use materialize::{ImmutableObjectFactory, ObjectFactory};
pub use stored::{AsObject, Storable, StoredObject};
