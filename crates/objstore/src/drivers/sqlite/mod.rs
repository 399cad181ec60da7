//! SQLite driver.
//!
//! - [`SqliteDialect`]: SQL syntax strategy for SQLite
//! - [`SqliteConnection`]: SQLx-backed execution surface

mod connection;
mod dialect;

pub use connection::{SqliteConnection, SqliteTransaction};
pub use dialect::SqliteDialect;
