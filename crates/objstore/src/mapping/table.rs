//! Dialect-specific SQL text for the fixed statement set of a type.
//!
//! Column order always follows the [`FieldMapping`] indices. The identity is
//! bound first in inserts and last in updates, so value rows built from an
//! object's `[key, values...]` layout line up with the placeholders.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::core::traits::Dialect;
use crate::drivers::DialectImpl;
use crate::error::{Result, StorageError};

use super::field::FieldMapping;

/// Largest key count whose statement text is kept in the cache. Reads are
/// chunked below the default `max_in_list`; larger deletes are generated on
/// every call.
const MAX_CACHED_KEY_COUNT: usize = 500;

/// Statements a [`TableMapping`] can generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statement {
    SelectAll,
    SelectSome,
    SelectKeys,
    SelectCount,
    Insert,
    Update,
    Delete,
    DeleteAll,
}

impl Statement {
    /// Every statement, in presentation order.
    pub const ALL: [Statement; 8] = [
        Statement::SelectAll,
        Statement::SelectSome,
        Statement::SelectKeys,
        Statement::SelectCount,
        Statement::Insert,
        Statement::Update,
        Statement::Delete,
        Statement::DeleteAll,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Statement::SelectAll => "select_all",
            Statement::SelectSome => "select_some",
            Statement::SelectKeys => "select_keys",
            Statement::SelectCount => "select_count",
            Statement::Insert => "insert",
            Statement::Update => "update",
            Statement::Delete => "delete",
            Statement::DeleteAll => "delete_all",
        }
    }

    /// Whether the statement takes a key count.
    pub fn is_sized(&self) -> bool {
        matches!(
            self,
            Statement::SelectSome | Statement::SelectKeys | Statement::Delete
        )
    }
}

/// SQL generator for one (type, dialect) pair.
///
/// Generated text is memoised per (statement, key count) up to
/// `MAX_CACHED_KEY_COUNT` keys; identical inputs always produce identical
/// text.
#[derive(Debug)]
pub struct TableMapping {
    mapping: Arc<FieldMapping>,
    dialect: DialectImpl,
    cache: RwLock<HashMap<(Statement, usize), Option<String>>>,
}

impl TableMapping {
    pub fn new(mapping: Arc<FieldMapping>, dialect: DialectImpl) -> Self {
        Self {
            mapping,
            dialect,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn mapping(&self) -> &Arc<FieldMapping> {
        &self.mapping
    }

    pub fn dialect(&self) -> &DialectImpl {
        &self.dialect
    }

    /// `SELECT id, f0, ... FROM t`
    pub fn select_all(&self) -> String {
        self.text(Statement::SelectAll, 0)
    }

    /// `SELECT id, f0, ... FROM t WHERE id IN (p1, ..., pn)`
    pub fn select_some(&self, count: usize) -> Result<String> {
        self.sized(Statement::SelectSome, count)
    }

    /// `SELECT id FROM t WHERE id IN (p1, ..., pn)`
    pub fn select_keys(&self, count: usize) -> Result<String> {
        self.sized(Statement::SelectKeys, count)
    }

    /// `SELECT COUNT(*) FROM t`
    pub fn select_count(&self) -> String {
        self.text(Statement::SelectCount, 0)
    }

    /// `INSERT INTO t (id, f0, ...) VALUES (p1, ...)`
    pub fn insert(&self) -> String {
        self.text(Statement::Insert, 0)
    }

    /// `UPDATE t SET f0 = p1, ... WHERE id = pn+1`, or `None` when the type
    /// has no fields to set.
    pub fn update(&self) -> Option<String> {
        self.generate(Statement::Update, 0)
    }

    /// `DELETE FROM t WHERE id IN (p1, ..., pn)`
    pub fn delete(&self, count: usize) -> Result<String> {
        self.sized(Statement::Delete, count)
    }

    /// `DELETE FROM t`
    pub fn delete_all(&self) -> String {
        self.text(Statement::DeleteAll, 0)
    }

    /// Text of any statement; sized statements use `count` keys.
    pub fn statement(&self, statement: Statement, count: usize) -> Result<Option<String>> {
        if statement.is_sized() {
            self.sized(statement, count).map(Some)
        } else {
            Ok(self.generate(statement, 0))
        }
    }

    fn sized(&self, statement: Statement, count: usize) -> Result<String> {
        if count == 0 {
            return Err(StorageError::illegal_argument(format!(
                "{} for {} needs at least one key",
                statement.name(),
                self.mapping.type_name()
            )));
        }
        Ok(self.text(statement, count))
    }

    fn text(&self, statement: Statement, count: usize) -> String {
        self.generate(statement, count).unwrap_or_default()
    }

    fn generate(&self, statement: Statement, count: usize) -> Option<String> {
        let key = (statement, count);
        {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(sql) = cache.get(&key) {
                return sql.clone();
            }
        }

        let sql = self.build(statement, count);
        debug!(
            "{} {}({}): {}",
            self.mapping.type_name(),
            statement.name(),
            count,
            sql.as_deref().unwrap_or("<none>")
        );

        if count > MAX_CACHED_KEY_COUNT {
            return sql;
        }
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        cache.entry(key).or_insert(sql).clone()
    }

    fn build(&self, statement: Statement, count: usize) -> Option<String> {
        let table = self
            .dialect
            .qualify_table(self.mapping.schema(), self.mapping.type_name());
        let key = self.dialect.quote_ident(self.mapping.key_column());

        let sql = match statement {
            Statement::SelectAll => format!("SELECT {} FROM {}", self.all_columns(), table),
            Statement::SelectSome => format!(
                "SELECT {} FROM {} WHERE {} IN ({})",
                self.all_columns(),
                table,
                key,
                self.placeholders(1, count)
            ),
            Statement::SelectKeys => format!(
                "SELECT {} FROM {} WHERE {} IN ({})",
                key,
                table,
                key,
                self.placeholders(1, count)
            ),
            Statement::SelectCount => format!("SELECT COUNT(*) FROM {}", table),
            Statement::Insert => format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                self.all_columns(),
                self.placeholders(1, self.mapping.field_count() + 1)
            ),
            Statement::Update => {
                let fields = self.mapping.field_names();
                if fields.is_empty() {
                    return None;
                }
                let assignments = fields
                    .iter()
                    .enumerate()
                    .map(|(i, f)| {
                        format!(
                            "{} = {}",
                            self.dialect.quote_ident(f),
                            self.dialect.param_placeholder(i + 1)
                        )
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "UPDATE {} SET {} WHERE {} = {}",
                    table,
                    assignments,
                    key,
                    self.dialect.param_placeholder(fields.len() + 1)
                )
            }
            Statement::Delete => format!(
                "DELETE FROM {} WHERE {} IN ({})",
                table,
                key,
                self.placeholders(1, count)
            ),
            Statement::DeleteAll => format!("DELETE FROM {}", table),
        };
        Some(sql)
    }

    fn all_columns(&self) -> String {
        std::iter::once(self.mapping.key_column())
            .chain(self.mapping.field_names().iter().map(String::as_str))
            .map(|c| self.dialect.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn placeholders(&self, first: usize, count: usize) -> String {
        (first..first + count)
            .map(|i| self.dialect.param_placeholder(i))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::{FieldType, KeyType};
    use crate::drivers::{MssqlDialect, MysqlDialect, PostgresDialect, SqliteDialect};
    use crate::mapping::ObjectType;

    fn person() -> Arc<FieldMapping> {
        let t = ObjectType::new("Person", KeyType::Int)
            .field("name", FieldType::Text)
            .field("age", FieldType::I32)
            .field("birthday", FieldType::Date);
        Arc::new(FieldMapping::resolve(&t).unwrap())
    }

    fn pg() -> TableMapping {
        TableMapping::new(person(), DialectImpl::Postgres(PostgresDialect::new()))
    }

    fn cached(t: &TableMapping) -> usize {
        t.cache.read().unwrap().len()
    }

    #[test]
    fn test_large_key_counts_are_not_cached() {
        let t = pg();
        t.delete(3).unwrap();
        assert_eq!(cached(&t), 1);

        let first = t.delete(MAX_CACHED_KEY_COUNT + 1).unwrap();
        let second = t.delete(MAX_CACHED_KEY_COUNT + 1).unwrap();
        assert_eq!(first, second);
        assert!(first.ends_with(&format!("${})", MAX_CACHED_KEY_COUNT + 1)));
        t.delete(5_000).unwrap();
        assert_eq!(cached(&t), 1);
    }

    #[test]
    fn test_select_statements() {
        let t = pg();
        assert_eq!(
            t.select_all(),
            r#"SELECT "id", "age", "birthday", "name" FROM "Person""#
        );
        assert_eq!(
            t.select_some(2).unwrap(),
            r#"SELECT "id", "age", "birthday", "name" FROM "Person" WHERE "id" IN ($1, $2)"#
        );
        assert_eq!(
            t.select_keys(3).unwrap(),
            r#"SELECT "id" FROM "Person" WHERE "id" IN ($1, $2, $3)"#
        );
        assert_eq!(t.select_count(), r#"SELECT COUNT(*) FROM "Person""#);
    }

    #[test]
    fn test_insert_puts_identity_first() {
        assert_eq!(
            pg().insert(),
            r#"INSERT INTO "Person" ("id", "age", "birthday", "name") VALUES ($1, $2, $3, $4)"#
        );
    }

    #[test]
    fn test_update_puts_identity_last() {
        assert_eq!(
            pg().update().unwrap(),
            r#"UPDATE "Person" SET "age" = $1, "birthday" = $2, "name" = $3 WHERE "id" = $4"#
        );
    }

    #[test]
    fn test_delete_statements() {
        let t = pg();
        assert_eq!(t.delete(1).unwrap(), r#"DELETE FROM "Person" WHERE "id" IN ($1)"#);
        assert_eq!(t.delete_all(), r#"DELETE FROM "Person""#);
    }

    #[test]
    fn test_zero_count_is_rejected() {
        let t = pg();
        assert!(matches!(t.select_some(0), Err(StorageError::IllegalArgument(_))));
        assert!(t.select_keys(0).is_err());
        assert!(t.delete(0).is_err());
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = pg();
        let b = pg();
        for statement in Statement::ALL {
            assert_eq!(
                a.statement(statement, 4).unwrap(),
                b.statement(statement, 4).unwrap()
            );
            assert_eq!(
                a.statement(statement, 4).unwrap(),
                a.statement(statement, 4).unwrap()
            );
        }
    }

    #[test]
    fn test_dialect_quoting_and_placeholders() {
        let mssql = TableMapping::new(person(), DialectImpl::Mssql(MssqlDialect::new()));
        assert_eq!(
            mssql.select_keys(2).unwrap(),
            "SELECT [id] FROM [Person] WHERE [id] IN (@P1, @P2)"
        );

        let mysql = TableMapping::new(person(), DialectImpl::Mysql(MysqlDialect::new()));
        assert_eq!(mysql.delete(2).unwrap(), "DELETE FROM `Person` WHERE `id` IN (?, ?)");

        let sqlite = TableMapping::new(person(), DialectImpl::Sqlite(SqliteDialect::new()));
        assert!(sqlite.update().unwrap().ends_with(r#"WHERE "id" = ?4"#));
    }

    #[test]
    fn test_schema_qualified_table() {
        let t = ObjectType::new("Person", KeyType::Int)
            .with_schema("people")
            .field("name", FieldType::Text);
        let mapping = Arc::new(FieldMapping::resolve(&t).unwrap());
        let table = TableMapping::new(mapping, DialectImpl::Postgres(PostgresDialect::new()));
        assert_eq!(table.select_count(), r#"SELECT COUNT(*) FROM "people"."Person""#);
    }

    #[test]
    fn test_type_without_fields_has_no_update() {
        let t = ObjectType::new("Tag", KeyType::Text);
        let mapping = Arc::new(FieldMapping::resolve(&t).unwrap());
        let table = TableMapping::new(mapping, DialectImpl::Postgres(PostgresDialect::new()));
        assert_eq!(table.update(), None);
        assert_eq!(table.insert(), r#"INSERT INTO "Tag" ("id") VALUES ($1)"#);
    }
}
