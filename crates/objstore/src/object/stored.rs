//! Read-only object instances and the traits typed views build on.

use std::fmt;
use std::sync::Arc;

use crate::core::value::{FromSqlValue, ObjectKey, SqlValue};
use crate::error::{Result, StorageError};
use crate::mapping::{FieldMapping, ObjectType};

use super::builder::ObjectBuilder;

/// An immutable object: a key plus a value array aligned to the type's
/// field indices.
///
/// Cloning is cheap; the value array is shared.
#[derive(Clone)]
pub struct StoredObject {
    mapping: Arc<FieldMapping>,
    key: ObjectKey,
    values: Arc<[SqlValue]>,
}

impl StoredObject {
    /// Caller guarantees `values` is aligned to `mapping` and already
    /// coerced to the declared field types.
    pub(crate) fn from_parts(
        mapping: Arc<FieldMapping>,
        key: ObjectKey,
        values: Vec<SqlValue>,
    ) -> Self {
        Self {
            mapping,
            key,
            values: values.into(),
        }
    }

    /// The identity.
    pub fn id(&self) -> &ObjectKey {
        &self.key
    }

    /// Name of the registered type this object was built for.
    pub fn type_name(&self) -> &str {
        self.mapping.type_name()
    }

    /// The mapping backing this object.
    pub fn mapping(&self) -> &Arc<FieldMapping> {
        &self.mapping
    }

    /// All field values in index order.
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Raw value of a field.
    pub fn value(&self, field: &str) -> Result<&SqlValue> {
        let index = self.mapping.field_index(field)?;
        Ok(&self.values[index])
    }

    /// Typed value of a field.
    ///
    /// # Errors
    ///
    /// `IllegalArgument` for an unknown field, `TypeMismatch` when the value
    /// cannot be read as `T` (including NULL for non-`Option` types).
    pub fn get<T: FromSqlValue>(&self, field: &str) -> Result<T> {
        T::extract(field, self.value(field)?)
    }

    /// Invoke an accessor by name. The identity accessor returns the key.
    pub fn call(&self, accessor: &str) -> Result<SqlValue> {
        if accessor == self.mapping.identity_accessor() {
            return Ok(self.key.to_sql_value());
        }
        let index = self.mapping.accessor_index(accessor)?;
        Ok(self.values[index].clone())
    }

    /// Start an edit of this object; the builder carries the same key and
    /// values.
    pub fn modify(&self) -> ObjectBuilder {
        ObjectBuilder::from_parts(
            Arc::clone(&self.mapping),
            self.key.clone(),
            self.values.to_vec(),
        )
    }

    /// Wrap in a typed view.
    ///
    /// # Errors
    ///
    /// `IllegalArgument` when this object belongs to another type.
    pub fn into_typed<T: Storable>(self) -> Result<T> {
        if self.type_name() != T::TYPE_NAME {
            return Err(StorageError::illegal_argument(format!(
                "{} object {} cannot be viewed as {}",
                self.type_name(),
                self.key,
                T::TYPE_NAME
            )));
        }
        Ok(T::from_object(self))
    }

    /// Render as a JSON object keyed by column name.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert(
            self.mapping.key_column().to_string(),
            self.key.to_sql_value().to_json(),
        );
        for (name, value) in self.mapping.field_names().iter().zip(self.values.iter()) {
            map.insert(name.clone(), value.to_json());
        }
        serde_json::Value::Object(map)
    }
}

impl PartialEq for StoredObject {
    fn eq(&self, other: &Self) -> bool {
        self.type_name() == other.type_name()
            && self.key == other.key
            && self.values == other.values
    }
}

impl fmt::Debug for StoredObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.type_name());
        s.field(self.mapping.key_column(), &self.key);
        for (name, value) in self.mapping.field_names().iter().zip(self.values.iter()) {
            s.field(name, value);
        }
        s.finish()
    }
}

impl fmt::Display for StoredObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{{}={}}}", self.type_name(), self.mapping.key_column(), self.key)
    }
}

/// Anything that may hold a stored object.
///
/// `None` from [`as_object`](Self::as_object) is how batches express a
/// missing entry.
pub trait AsObject {
    fn as_object(&self) -> Option<&StoredObject>;
}

impl AsObject for StoredObject {
    fn as_object(&self) -> Option<&StoredObject> {
        Some(self)
    }
}

impl<T: AsObject + ?Sized> AsObject for &T {
    fn as_object(&self) -> Option<&StoredObject> {
        (**self).as_object()
    }
}

impl<T: AsObject> AsObject for Option<T> {
    fn as_object(&self) -> Option<&StoredObject> {
        self.as_ref().and_then(AsObject::as_object)
    }
}

/// A typed domain view over [`StoredObject`].
///
/// ```ignore
/// struct Person(StoredObject);
///
/// impl AsObject for Person {
///     fn as_object(&self) -> Option<&StoredObject> {
///         Some(&self.0)
///     }
/// }
///
/// impl Storable for Person {
///     const TYPE_NAME: &'static str = "Person";
///
///     fn object_type() -> ObjectType {
///         ObjectType::new("Person", KeyType::Int).field("name", FieldType::Text)
///     }
///
///     fn from_object(object: StoredObject) -> Self {
///         Person(object)
///     }
/// }
/// ```
pub trait Storable: AsObject + Sized {
    /// Registered type name; must equal `object_type().name`.
    const TYPE_NAME: &'static str;

    /// Declared accessor surface of the type.
    fn object_type() -> ObjectType;

    /// Wrap a stored object of this type.
    fn from_object(object: StoredObject) -> Self;
}
