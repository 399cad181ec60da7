//! Collaborator traits the storage engine is written against.
//!
//! - [`Dialect`]: identifier quoting and parameter placeholder strategy
//! - [`DatabaseConnection`]: non-transactional execution plus transaction
//!   creation
//! - [`DatabaseTransaction`]: execution inside one transaction, closed by
//!   exactly one `commit` or `rollback`
//!
//! Drivers implement these; the storage orchestrator never touches a driver
//! type directly.

use async_trait::async_trait;

use crate::drivers::DialectImpl;
use crate::error::Result;

use super::value::{FieldType, SqlValue};

/// One result row, positionally aligned to the requested shape.
pub type Row = Vec<SqlValue>;

/// SQL syntax strategy for different database engines.
///
/// # Design Pattern
///
/// This is a **Strategy** pattern - different implementations provide
/// interchangeable quoting and placeholder rules.
pub trait Dialect: Send + Sync {
    /// Get the dialect identifier (e.g., "mssql", "postgres").
    fn name(&self) -> &str;

    /// Quote an identifier (table name, column name, etc.).
    ///
    /// - MSSQL: `[identifier]`
    /// - PostgreSQL: `"identifier"`
    fn quote_ident(&self, name: &str) -> String;

    /// Get a parameter placeholder for the given 1-based index.
    ///
    /// - MSSQL: `@P1`, `@P2`, etc.
    /// - PostgreSQL: `$1`, `$2`, etc.
    fn param_placeholder(&self, index: usize) -> String;

    /// Quote a table name, qualified with its schema when one is given.
    fn qualify_table(&self, schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(schema) => format!("{}.{}", self.quote_ident(schema), self.quote_ident(table)),
            None => self.quote_ident(table),
        }
    }
}

/// Transaction isolation levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// SQL spelling, as used in `SET TRANSACTION ISOLATION LEVEL ...`.
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// Execution surface of a database, outside of any explicit transaction.
///
/// Each call runs in its own auto-committed unit of work.
#[async_trait]
pub trait DatabaseConnection: Send + Sync {
    /// The SQL dialect statements for this database must be generated in.
    fn dialect(&self) -> DialectImpl;

    /// Run a query, decoding each row into the given column shape.
    async fn query(&self, sql: &str, params: &[SqlValue], shape: &[FieldType]) -> Result<Vec<Row>>;

    /// Run a statement, returning the affected row count.
    async fn write(&self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    /// Run one statement once per parameter row, returning per-row counts.
    async fn batch_write(&self, sql: &str, rows: &[Vec<SqlValue>]) -> Result<Vec<u64>>;

    /// Start a transaction at the requested isolation level.
    ///
    /// The returned handle owns its connection until `commit` or `rollback`
    /// consumes it.
    async fn begin_transaction(
        &self,
        isolation: IsolationLevel,
    ) -> Result<Box<dyn DatabaseTransaction>>;
}

/// An ongoing database transaction.
///
/// `commit` and `rollback` take the boxed handle by value, so a transaction
/// can be closed exactly once. Dropping an open handle must release its
/// connection and discard the work.
#[async_trait]
pub trait DatabaseTransaction: Send {
    /// Run a query inside the transaction.
    async fn query(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        shape: &[FieldType],
    ) -> Result<Vec<Row>>;

    /// Run a statement inside the transaction.
    async fn write(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    /// Run one statement per parameter row inside the transaction.
    async fn batch_write(&mut self, sql: &str, rows: &[Vec<SqlValue>]) -> Result<Vec<u64>>;

    /// Commit and release the connection.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Roll back and release the connection.
    async fn rollback(self: Box<Self>) -> Result<()>;
}
