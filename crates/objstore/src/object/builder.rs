//! Mutable overlay that is finalized once into a [`StoredObject`].

use std::sync::Arc;

use crate::core::value::{FromSqlValue, ObjectKey, SqlValue};
use crate::error::{Result, StorageError};
use crate::mapping::FieldMapping;

use super::stored::StoredObject;

/// Builder for a new or edited object.
///
/// Every construction mode ends up here: a key plus an overlay aligned to
/// the field indices. After [`build`](Self::build) the builder rejects any
/// further mutation.
#[derive(Debug, Clone)]
pub struct ObjectBuilder {
    mapping: Arc<FieldMapping>,
    key: ObjectKey,
    values: Vec<SqlValue>,
    finalized: bool,
}

impl ObjectBuilder {
    /// Builder with every field NULL.
    pub(crate) fn empty(mapping: Arc<FieldMapping>, key: ObjectKey) -> Self {
        let values = mapping
            .field_types()
            .iter()
            .map(|t| SqlValue::Null(*t))
            .collect();
        Self::from_parts(mapping, key, values)
    }

    /// Builder over an existing overlay aligned to `mapping`.
    pub(crate) fn from_parts(
        mapping: Arc<FieldMapping>,
        key: ObjectKey,
        values: Vec<SqlValue>,
    ) -> Self {
        Self {
            mapping,
            key,
            values,
            finalized: false,
        }
    }

    /// The identity the object will be stored under.
    pub fn id(&self) -> &ObjectKey {
        &self.key
    }

    pub fn type_name(&self) -> &str {
        self.mapping.type_name()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Assign a field.
    ///
    /// The value is converted to the declared field type (integers widen,
    /// NULL is re-hinted).
    ///
    /// # Errors
    ///
    /// - `IllegalState` once the builder has been finalized
    /// - `IllegalArgument` for the identity column or an unknown field
    /// - `TypeMismatch` when the value cannot be stored in the field
    pub fn set(&mut self, field: &str, value: impl Into<SqlValue>) -> Result<&mut Self> {
        if self.finalized {
            return Err(StorageError::illegal_state(format!(
                "{} builder for {} is already finalized",
                self.mapping.type_name(),
                self.key
            )));
        }
        if field == self.mapping.key_column() {
            return Err(StorageError::illegal_argument(format!(
                "cannot re-assign the id of {} {}",
                self.mapping.type_name(),
                self.key
            )));
        }

        let index = self.mapping.field_index(field)?;
        let target = self.mapping.field_types()[index];
        let value = value.into();
        let found = value.field_type();
        self.values[index] = value.coerce_to(target).ok_or_else(|| StorageError::TypeMismatch {
            field: field.to_string(),
            expected: target.to_string(),
            found: found.to_string(),
        })?;
        Ok(self)
    }

    /// Assign a field through its setter name (`setAge`).
    pub fn call(&mut self, setter: &str, value: impl Into<SqlValue>) -> Result<&mut Self> {
        let field = FieldMapping::field_name_of(setter)
            .filter(|_| setter.starts_with("set"))
            .ok_or_else(|| {
                StorageError::illegal_argument(format!(
                    "'{}' is not a setter of type {}",
                    setter,
                    self.mapping.type_name()
                ))
            })?;
        self.set(&field, value)
    }

    /// Current overlay value of a field.
    pub fn value(&self, field: &str) -> Result<&SqlValue> {
        let index = self.mapping.field_index(field)?;
        Ok(&self.values[index])
    }

    /// Typed overlay value of a field.
    pub fn get<T: FromSqlValue>(&self, field: &str) -> Result<T> {
        T::extract(field, self.value(field)?)
    }

    /// Finalize into an immutable object. Works exactly once.
    pub fn build(&mut self) -> Result<StoredObject> {
        if self.finalized {
            return Err(StorageError::illegal_state(format!(
                "{} builder for {} was already built",
                self.mapping.type_name(),
                self.key
            )));
        }
        self.finalized = true;
        Ok(StoredObject::from_parts(
            Arc::clone(&self.mapping),
            self.key.clone(),
            self.values.clone(),
        ))
    }
}
