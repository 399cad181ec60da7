//! Core abstractions shared by every other module.
//!
//! - [`value`]: SQL values, field types and object keys
//! - [`identifier`]: identifier validation and quoting rules
//! - [`traits`]: dialect and execution-surface traits implemented by drivers

pub mod identifier;
pub mod traits;
pub mod value;

pub use traits::{DatabaseConnection, DatabaseTransaction, Dialect, IsolationLevel, Row};
pub use value::{FieldType, FromSqlValue, KeyType, ObjectKey, SqlValue};
