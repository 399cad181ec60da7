//! Database driver implementations.
//!
//! - [`postgres`], [`mysql`], [`mssql`]: dialects for statement generation
//! - [`sqlite`]: dialect plus a sqlx-backed [`DatabaseConnection`]
//!
//! Any other execution surface can be plugged in by implementing
//! [`DatabaseConnection`] and returning one of the dialects below.
//!
//! [`DatabaseConnection`]: crate::core::DatabaseConnection

pub mod mssql;
pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use mssql::MssqlDialect;
pub use mysql::MysqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::{SqliteConnection, SqliteDialect};

use crate::core::traits::Dialect;
use crate::error::{Result, StorageError};

/// Enum-based static dispatch for dialects.
///
/// The compiler generates a match statement instead of using vtable
/// dispatch, and the enum is cheap to clone into every table mapping.
#[derive(Debug, Clone)]
pub enum DialectImpl {
    Mssql(MssqlDialect),
    Mysql(MysqlDialect),
    Postgres(PostgresDialect),
    Sqlite(SqliteDialect),
}

impl Dialect for DialectImpl {
    fn name(&self) -> &str {
        match self {
            DialectImpl::Mssql(d) => d.name(),
            DialectImpl::Mysql(d) => d.name(),
            DialectImpl::Postgres(d) => d.name(),
            DialectImpl::Sqlite(d) => d.name(),
        }
    }

    fn quote_ident(&self, name: &str) -> String {
        match self {
            DialectImpl::Mssql(d) => d.quote_ident(name),
            DialectImpl::Mysql(d) => d.quote_ident(name),
            DialectImpl::Postgres(d) => d.quote_ident(name),
            DialectImpl::Sqlite(d) => d.quote_ident(name),
        }
    }

    fn param_placeholder(&self, index: usize) -> String {
        match self {
            DialectImpl::Mssql(d) => d.param_placeholder(index),
            DialectImpl::Mysql(d) => d.param_placeholder(index),
            DialectImpl::Postgres(d) => d.param_placeholder(index),
            DialectImpl::Sqlite(d) => d.param_placeholder(index),
        }
    }
}

impl DialectImpl {
    /// Create a dialect implementation from a database type string.
    ///
    /// # Errors
    ///
    /// Returns an error if the database type is not recognized.
    pub fn from_db_type(db_type: &str) -> Result<Self> {
        match db_type.to_lowercase().as_str() {
            "mssql" | "sqlserver" | "sql_server" => Ok(DialectImpl::Mssql(MssqlDialect::new())),
            "mysql" | "mariadb" => Ok(DialectImpl::Mysql(MysqlDialect::new())),
            "postgres" | "postgresql" | "pg" => Ok(DialectImpl::Postgres(PostgresDialect::new())),
            "sqlite" | "sqlite3" => Ok(DialectImpl::Sqlite(SqliteDialect::new())),
            other => Err(StorageError::Config(format!(
                "Unknown database type: '{}'. Supported types: mssql, mysql, postgres, sqlite",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_impl_from_db_type() {
        assert_eq!(DialectImpl::from_db_type("mssql").unwrap().name(), "mssql");
        assert_eq!(DialectImpl::from_db_type("postgres").unwrap().name(), "postgres");
        assert_eq!(DialectImpl::from_db_type("MySQL").unwrap().name(), "mysql");
        assert_eq!(DialectImpl::from_db_type("sqlite").unwrap().name(), "sqlite");

        // Alternative names
        assert!(DialectImpl::from_db_type("sqlserver").is_ok());
        assert!(DialectImpl::from_db_type("pg").is_ok());
        assert!(DialectImpl::from_db_type("mariadb").is_ok());

        assert!(DialectImpl::from_db_type("oracle").is_err());
    }

    #[test]
    fn test_dialect_impl_dispatch() {
        let dialect = DialectImpl::Mssql(MssqlDialect::new());
        assert_eq!(dialect.quote_ident("table"), "[table]");
        assert_eq!(dialect.param_placeholder(1), "@P1");

        let dialect = DialectImpl::Postgres(PostgresDialect::new());
        assert_eq!(dialect.quote_ident("table"), "\"table\"");
        assert_eq!(dialect.param_placeholder(2), "$2");
    }
}
