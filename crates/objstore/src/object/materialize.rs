//! Materialization of result rows into objects.

use std::fmt::Debug;
use std::sync::Arc;

use crate::core::traits::Row;
use crate::core::value::{ObjectKey, SqlValue};
use crate::error::{Result, StorageError};
use crate::mapping::FieldMapping;

use super::stored::StoredObject;

/// Turns a `[key, field values...]` row into an object instance.
pub trait ObjectFactory: Send + Sync + Debug {
    fn materialize(&self, mapping: &Arc<FieldMapping>, row: Row) -> Result<StoredObject>;
}

/// Default factory producing read-only [`StoredObject`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmutableObjectFactory;

impl ObjectFactory for ImmutableObjectFactory {
    fn materialize(&self, mapping: &Arc<FieldMapping>, row: Row) -> Result<StoredObject> {
        if row.len() != mapping.field_count() + 1 {
            return Err(StorageError::illegal_state(format!(
                "{} row has {} columns, expected {}",
                mapping.type_name(),
                row.len(),
                mapping.field_count() + 1
            )));
        }

        let mut columns = row.into_iter();
        let key = match columns.next() {
            Some(value) => ObjectKey::from_sql_value(value)?,
            None => return Err(StorageError::illegal_state("row without identity")),
        };

        let values = columns
            .zip(mapping.field_names().iter().zip(mapping.field_types()))
            .map(|(value, (name, field_type))| {
                let found = value.field_type();
                value
                    .coerce_to(*field_type)
                    .ok_or_else(|| StorageError::TypeMismatch {
                        field: name.clone(),
                        expected: field_type.to_string(),
                        found: found.to_string(),
                    })
            })
            .collect::<Result<Vec<SqlValue>>>()?;

        Ok(StoredObject::from_parts(Arc::clone(mapping), key, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::{FieldType, KeyType};
    use crate::mapping::ObjectType;

    fn mapping() -> Arc<FieldMapping> {
        let t = ObjectType::new("Person", KeyType::Int)
            .field("name", FieldType::Text)
            .field("age", FieldType::I32);
        Arc::new(FieldMapping::resolve(&t).unwrap())
    }

    #[test]
    fn test_materialize_row() {
        let row = vec![
            SqlValue::I64(2),
            SqlValue::I64(49),
            SqlValue::from("Jacques Brel"),
        ];
        let object = ImmutableObjectFactory.materialize(&mapping(), row).unwrap();
        assert_eq!(object.id(), &ObjectKey::from(2));
        assert_eq!(object.value("age").unwrap(), &SqlValue::I32(49));
    }

    #[test]
    fn test_materialize_rejects_wrong_width() {
        let row = vec![SqlValue::I64(2)];
        let err = ImmutableObjectFactory.materialize(&mapping(), row).unwrap_err();
        assert!(matches!(err, StorageError::IllegalState(_)));
    }

    #[test]
    fn test_materialize_rejects_null_key() {
        let row = vec![
            SqlValue::Null(FieldType::I64),
            SqlValue::I32(1),
            SqlValue::from("x"),
        ];
        assert!(ImmutableObjectFactory.materialize(&mapping(), row).is_err());
    }
}
