//! SQLite execution surface.
//!
//! Implements [`DatabaseConnection`] and [`DatabaseTransaction`] on top of
//! an SQLx pool. Values are bound by their [`SqlValue`] variant and decoded
//! according to the column shape the caller asks for.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row as _;
use tracing::{debug, info};

use super::dialect::SqliteDialect;
use crate::config::DatabaseConfig;
use crate::core::traits::{DatabaseConnection, DatabaseTransaction, IsolationLevel, Row};
use crate::core::value::{FieldType, SqlValue};
use crate::drivers::DialectImpl;
use crate::error::{Result, StorageError};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// SQLite database backed by an SQLx pool.
#[derive(Debug, Clone)]
pub struct SqliteConnection {
    pool: SqlitePool,
}

impl SqliteConnection {
    /// Open the configured database.
    ///
    /// An in-memory database lives only as long as its connection, so its
    /// pool is pinned to a single connection that is never recycled.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

        let pool_options = if config.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections)
        };

        let pool = pool_options
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(options)
            .await?;

        // Test connection
        sqlx::query("SELECT 1").fetch_one(&pool).await?;

        info!("Connected to SQLite: {}", config.redacted_url());
        Ok(Self { pool })
    }

    /// Open a private in-memory database.
    pub async fn in_memory() -> Result<Self> {
        Self::connect(&DatabaseConfig {
            r#type: "sqlite".to_string(),
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        })
        .await
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for schema setup and ad-hoc SQL.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl DatabaseConnection for SqliteConnection {
    fn dialect(&self) -> DialectImpl {
        DialectImpl::Sqlite(SqliteDialect::new())
    }

    async fn query(&self, sql: &str, params: &[SqlValue], shape: &[FieldType]) -> Result<Vec<Row>> {
        let rows = bind_all(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;
        decode_rows(&rows, shape)
    }

    async fn write(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let result = bind_all(sqlx::query(sql), params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn batch_write(&self, sql: &str, rows: &[Vec<SqlValue>]) -> Result<Vec<u64>> {
        let mut tx = self.pool.begin().await?;
        let mut counts = Vec::with_capacity(rows.len());
        for params in rows {
            let result = bind_all(sqlx::query(sql), params)
                .execute(&mut *tx)
                .await?;
            counts.push(result.rows_affected());
        }
        tx.commit().await?;
        Ok(counts)
    }

    async fn begin_transaction(
        &self,
        isolation: IsolationLevel,
    ) -> Result<Box<dyn DatabaseTransaction>> {
        // SQLite transactions are always serializable. IMMEDIATE takes the
        // write lock up front so concurrent writers wait on busy_timeout
        // instead of failing on the lock upgrade.
        debug!(
            "SQLite: beginning immediate transaction (requested {})",
            isolation.as_sql()
        );
        let tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        Ok(Box::new(SqliteTransaction { tx }))
    }
}

/// An open SQLite transaction. Dropping it rolls back.
pub struct SqliteTransaction {
    tx: sqlx::Transaction<'static, Sqlite>,
}

#[async_trait]
impl DatabaseTransaction for SqliteTransaction {
    async fn query(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        shape: &[FieldType],
    ) -> Result<Vec<Row>> {
        let rows = bind_all(sqlx::query(sql), params)
            .fetch_all(&mut *self.tx)
            .await?;
        decode_rows(&rows, shape)
    }

    async fn write(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let result = bind_all(sqlx::query(sql), params)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn batch_write(&mut self, sql: &str, rows: &[Vec<SqlValue>]) -> Result<Vec<u64>> {
        let mut counts = Vec::with_capacity(rows.len());
        for params in rows {
            let result = bind_all(sqlx::query(sql), params)
                .execute(&mut *self.tx)
                .await?;
            counts.push(result.rows_affected());
        }
        Ok(counts)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

fn bind_all<'q>(query: SqliteQuery<'q>, params: &[SqlValue]) -> SqliteQuery<'q> {
    params.iter().fold(query, bind_value)
}

/// Bind one value; NULLs are bound with their hinted type.
fn bind_value<'q>(query: SqliteQuery<'q>, value: &SqlValue) -> SqliteQuery<'q> {
    match value {
        SqlValue::Null(t) => match t {
            FieldType::Bool => query.bind(None::<bool>),
            FieldType::I32 => query.bind(None::<i32>),
            FieldType::I64 => query.bind(None::<i64>),
            FieldType::F64 => query.bind(None::<f64>),
            FieldType::Text => query.bind(None::<String>),
            FieldType::Bytes => query.bind(None::<Vec<u8>>),
            FieldType::Uuid => query.bind(None::<uuid::Uuid>),
            FieldType::Date => query.bind(None::<chrono::NaiveDate>),
            FieldType::DateTime => query.bind(None::<chrono::NaiveDateTime>),
            FieldType::Time => query.bind(None::<chrono::NaiveTime>),
        },
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::I32(v) => query.bind(*v),
        SqlValue::I64(v) => query.bind(*v),
        SqlValue::F64(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.clone()),
        SqlValue::Bytes(v) => query.bind(v.clone()),
        SqlValue::Uuid(v) => query.bind(*v),
        SqlValue::Date(v) => query.bind(*v),
        SqlValue::DateTime(v) => query.bind(*v),
        SqlValue::Time(v) => query.bind(*v),
    }
}

fn decode_rows(rows: &[SqliteRow], shape: &[FieldType]) -> Result<Vec<Row>> {
    rows.iter().map(|row| decode_row(row, shape)).collect()
}

/// Convert an SQLite row to values aligned with `shape`.
fn decode_row(row: &SqliteRow, shape: &[FieldType]) -> Result<Row> {
    if row.len() != shape.len() {
        return Err(StorageError::Execution(format!(
            "expected {} columns, got {}",
            shape.len(),
            row.len()
        )));
    }

    shape
        .iter()
        .enumerate()
        .map(|(i, field_type)| -> Result<SqlValue> {
            let value = match field_type {
                FieldType::Bool => row.try_get::<Option<bool>, _>(i)?.map(SqlValue::Bool),
                FieldType::I32 => row.try_get::<Option<i32>, _>(i)?.map(SqlValue::I32),
                FieldType::I64 => row.try_get::<Option<i64>, _>(i)?.map(SqlValue::I64),
                FieldType::F64 => row.try_get::<Option<f64>, _>(i)?.map(SqlValue::F64),
                FieldType::Text => row.try_get::<Option<String>, _>(i)?.map(SqlValue::Text),
                FieldType::Bytes => row.try_get::<Option<Vec<u8>>, _>(i)?.map(SqlValue::Bytes),
                FieldType::Uuid => row.try_get::<Option<uuid::Uuid>, _>(i)?.map(SqlValue::Uuid),
                FieldType::Date => row
                    .try_get::<Option<chrono::NaiveDate>, _>(i)?
                    .map(SqlValue::Date),
                FieldType::DateTime => row
                    .try_get::<Option<chrono::NaiveDateTime>, _>(i)?
                    .map(SqlValue::DateTime),
                FieldType::Time => row
                    .try_get::<Option<chrono::NaiveTime>, _>(i)?
                    .map(SqlValue::Time),
            };
            Ok(value.unwrap_or(SqlValue::Null(*field_type)))
        })
        .collect()
}
