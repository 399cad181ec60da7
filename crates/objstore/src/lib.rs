//! # objstore
//!
//! Object storage over relational databases.
//!
//! Storable types are declared once as an [`ObjectType`] (an accessor
//! surface such as `getName`, `getAge`, `isRetired`). Registration resolves
//! that surface into a [`FieldMapping`]: a sorted, indexed field schema that
//! every generated statement and every value array follows. On top of it
//! the library provides:
//!
//! - **Objects**: read-only [`StoredObject`]s and build-once
//!   [`ObjectBuilder`]s sharing one positional value layout
//! - **SQL generation** for PostgreSQL, MySQL, SQL Server and SQLite
//! - **Batched upserts**: `put_all` classifies objects as new or existing
//!   and writes both groups in one serializable transaction
//! - **SQLite execution** through SQLx
//!
//! ## Example
//!
//! ```rust,no_run
//! use objstore::{Config, ObjectStorage};
//!
//! #[tokio::main]
//! async fn main() -> objstore::Result<()> {
//!     let config = Config::load("objstore.yaml")?;
//!     let storage = ObjectStorage::connect(&config).await?;
//!
//!     let mut elvis = storage.builder_factory().new_object("Person", 1)?;
//!     elvis.set("name", "Elvis Presley")?.set("age", 42)?;
//!     storage.put_all(&[elvis.build()?]).await?;
//!
//!     println!("{} people", storage.get_size("Person").await?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod mapping;
pub mod object;
pub mod storage;

// Re-exports for convenient access
pub use crate::config::{Config, DatabaseConfig, StorageConfig};
pub use crate::core::{
    DatabaseConnection, DatabaseTransaction, Dialect, FieldType, FromSqlValue, IsolationLevel,
    KeyType, ObjectKey, Row, SqlValue,
};
pub use crate::drivers::{DialectImpl, SqliteConnection};
pub use crate::error::{Result, StorageError};
pub use crate::mapping::{
    Accessor, FieldMapping, MappingRegistry, ObjectType, Statement, TableMapping,
};
pub use crate::object::{
    AsObject, ImmutableObjectFactory, ObjectBuilder, ObjectBuilderFactory, ObjectFactory,
    Storable, StoredObject,
};
pub use crate::storage::{ObjectStorage, StorageOptions, Trigger};
