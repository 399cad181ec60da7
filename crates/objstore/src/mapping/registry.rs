//! Per-storage registry of resolved mappings.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::core::traits::Dialect;
use crate::drivers::DialectImpl;
use crate::error::{Result, StorageError};

use super::field::FieldMapping;
use super::object_type::ObjectType;
use super::table::TableMapping;

/// Registered field mappings and their cached table mappings.
///
/// The first registration of a type name wins; later registrations return
/// the mapping already stored. Mappings are resolved outside the lock, so
/// readers only ever see fully built entries.
#[derive(Debug, Default)]
pub struct MappingRegistry {
    fields: RwLock<HashMap<String, Arc<FieldMapping>>>,
    tables: RwLock<HashMap<(String, String), Arc<TableMapping>>>,
}

impl MappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type, returning its mapping.
    pub fn register(&self, object_type: &ObjectType) -> Result<Arc<FieldMapping>> {
        if let Some(existing) = self.get(&object_type.name) {
            return Ok(existing);
        }

        let resolved = Arc::new(FieldMapping::resolve(object_type)?);
        let mut fields = self.fields.write().unwrap_or_else(|e| e.into_inner());
        let mapping = fields
            .entry(object_type.name.clone())
            .or_insert_with(|| {
                info!(
                    "Registered {} with {} fields",
                    resolved.type_name(),
                    resolved.field_count()
                );
                resolved
            })
            .clone();
        Ok(mapping)
    }

    /// Mapping of a registered type.
    pub fn get(&self, type_name: &str) -> Option<Arc<FieldMapping>> {
        let fields = self.fields.read().unwrap_or_else(|e| e.into_inner());
        fields.get(type_name).cloned()
    }

    /// Mapping of a registered type, failing for unregistered ones.
    pub fn require(&self, type_name: &str, operation: &str) -> Result<Arc<FieldMapping>> {
        self.get(type_name).ok_or_else(|| {
            StorageError::illegal_argument(format!(
                "Cannot call ObjectStorage::{}(...) with non-registered type {}",
                operation, type_name
            ))
        })
    }

    /// Names of all registered types, sorted.
    pub fn type_names(&self) -> Vec<String> {
        let fields = self.fields.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = fields.keys().cloned().collect();
        names.sort();
        names
    }

    /// Table mapping of a registered mapping in a dialect, created on first
    /// use.
    pub fn table_mapping(
        &self,
        mapping: &Arc<FieldMapping>,
        dialect: &DialectImpl,
    ) -> Arc<TableMapping> {
        let key = (mapping.type_name().to_string(), dialect.name().to_string());
        {
            let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
            if let Some(table) = tables.get(&key) {
                return Arc::clone(table);
            }
        }

        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        Arc::clone(tables.entry(key).or_insert_with(|| {
            debug!(
                "Created {} table mapping for {}",
                dialect.name(),
                mapping.type_name()
            );
            Arc::new(TableMapping::new(Arc::clone(mapping), dialect.clone()))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::{FieldType, KeyType};
    use crate::drivers::{PostgresDialect, SqliteDialect};

    fn person() -> ObjectType {
        ObjectType::new("Person", KeyType::Int)
            .field("name", FieldType::Text)
            .field("age", FieldType::I32)
    }

    #[test]
    fn test_first_registration_wins() {
        let registry = MappingRegistry::new();
        let first = registry.register(&person()).unwrap();
        let second = registry
            .register(&person().field("height", FieldType::F64))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.field_count(), 2);
    }

    #[test]
    fn test_concurrent_registration_keeps_one_mapping() {
        let registry = MappingRegistry::new();
        let mappings: Vec<Arc<FieldMapping>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let registry = &registry;
                    scope.spawn(move || {
                        let field = format!("f{}", i % 2);
                        let object_type =
                            ObjectType::new("P", KeyType::Int).field(&field, FieldType::I32);
                        registry.register(&object_type).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let winner = registry.get("P").unwrap();
        assert!(mappings.iter().all(|m| Arc::ptr_eq(m, &winner)));
        assert_eq!(winner.field_count(), 1);
        let name = &winner.field_names()[0];
        assert!(name == "f0" || name == "f1");
        assert_eq!(registry.type_names(), vec!["P".to_string()]);
    }

    #[test]
    fn test_require_unregistered_type() {
        let registry = MappingRegistry::new();
        let err = registry.require("Person", "get").unwrap_err();
        assert!(matches!(err, StorageError::IllegalArgument(_)));
        assert!(err.to_string().contains("non-registered type Person"));
    }

    #[test]
    fn test_invalid_type_is_not_registered() {
        let registry = MappingRegistry::new();
        let bad = ObjectType::new("", KeyType::Int);
        assert!(registry.register(&bad).is_err());
        assert!(registry.type_names().is_empty());
    }

    #[test]
    fn test_table_mappings_are_cached_per_dialect() {
        let registry = MappingRegistry::new();
        let mapping = registry.register(&person()).unwrap();
        let pg = DialectImpl::Postgres(PostgresDialect::new());
        let sqlite = DialectImpl::Sqlite(SqliteDialect::new());

        let a = registry.table_mapping(&mapping, &pg);
        let b = registry.table_mapping(&mapping, &pg);
        let c = registry.table_mapping(&mapping, &sqlite);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(c.dialect().name(), "sqlite");
    }
}
