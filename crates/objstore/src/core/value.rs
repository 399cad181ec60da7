//! SQL value types shared by field mappings, objects and drivers.
//!
//! Every persisted field is described by a [`FieldType`] and carried as a
//! [`SqlValue`]. Identities are carried separately as an [`ObjectKey`],
//! which is hashable so that existence checks can be answered with a set.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, StorageError};

/// Declared type of a persisted field.
///
/// Also used as the type hint of a NULL so that drivers can bind it with the
/// correct wire type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Bool,
    I32,
    I64,
    F64,
    Text,
    Bytes,
    Uuid,
    Date,
    DateTime,
    Time,
}

impl FieldType {
    /// Name used in error messages and YAML.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Bool => "bool",
            FieldType::I32 => "i32",
            FieldType::I64 => "i64",
            FieldType::F64 => "f64",
            FieldType::Text => "text",
            FieldType::Bytes => "bytes",
            FieldType::Uuid => "uuid",
            FieldType::Date => "date",
            FieldType::DateTime => "date_time",
            FieldType::Time => "time",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// SQL value enum for type-safe row handling.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL with type hint for correct parameter binding.
    Null(FieldType),
    Bool(bool),
    I32(i32),
    I64(i64),
    F64(f64),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null(_))
    }

    /// The field type this value carries (the hint, for NULL).
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        match self {
            SqlValue::Null(t) => *t,
            SqlValue::Bool(_) => FieldType::Bool,
            SqlValue::I32(_) => FieldType::I32,
            SqlValue::I64(_) => FieldType::I64,
            SqlValue::F64(_) => FieldType::F64,
            SqlValue::Text(_) => FieldType::Text,
            SqlValue::Bytes(_) => FieldType::Bytes,
            SqlValue::Uuid(_) => FieldType::Uuid,
            SqlValue::Date(_) => FieldType::Date,
            SqlValue::DateTime(_) => FieldType::DateTime,
            SqlValue::Time(_) => FieldType::Time,
        }
    }

    /// Convert this value so it can be stored in a field of type `target`.
    ///
    /// NULLs are re-hinted, integers widen (and narrow when they fit) and
    /// integers become doubles. Anything else must already match.
    pub fn coerce_to(self, target: FieldType) -> Option<SqlValue> {
        match (self, target) {
            (SqlValue::Null(_), t) => Some(SqlValue::Null(t)),
            (SqlValue::I32(v), FieldType::I64) => Some(SqlValue::I64(i64::from(v))),
            (SqlValue::I64(v), FieldType::I32) => i32::try_from(v).ok().map(SqlValue::I32),
            (SqlValue::I32(v), FieldType::F64) => Some(SqlValue::F64(f64::from(v))),
            (v, t) if v.field_type() == t => Some(v),
            _ => None,
        }
    }

    /// Render as JSON for command-line output.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            SqlValue::Null(_) => Value::Null,
            SqlValue::Bool(v) => Value::Bool(*v),
            SqlValue::I32(v) => Value::from(*v),
            SqlValue::I64(v) => Value::from(*v),
            SqlValue::F64(v) => Value::from(*v),
            SqlValue::Text(v) => Value::String(v.clone()),
            SqlValue::Bytes(v) => Value::Array(v.iter().map(|b| Value::from(*b)).collect()),
            SqlValue::Uuid(v) => Value::String(v.to_string()),
            SqlValue::Date(v) => Value::String(v.format("%Y-%m-%d").to_string()),
            SqlValue::DateTime(v) => Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            SqlValue::Time(v) => Value::String(v.format("%H:%M:%S%.f").to_string()),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null(_) => f.write_str("NULL"),
            SqlValue::Text(v) => write!(f, "{:?}", v),
            SqlValue::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            other => f.write_str(&other.to_json().to_string()),
        }
    }
}

// From implementations for common types
impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::I32(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v)
    }
}

impl From<NaiveTime> for SqlValue {
    fn from(v: NaiveTime) -> Self {
        SqlValue::Time(v)
    }
}

impl From<ObjectKey> for SqlValue {
    fn from(v: ObjectKey) -> Self {
        match v {
            ObjectKey::Int(i) => SqlValue::I64(i),
            ObjectKey::Text(s) => SqlValue::Text(s),
            ObjectKey::Uuid(u) => SqlValue::Uuid(u),
        }
    }
}

/// Typed extraction from a [`SqlValue`].
///
/// Implemented for the Rust types a field can be read as. `Option<T>` maps
/// NULL to `None`; the plain types reject NULL.
pub trait FromSqlValue: Sized {
    /// Name of the expected type, for error messages.
    fn expected() -> &'static str;

    /// Convert, returning `None` when the value has an incompatible type.
    fn from_sql_value(value: &SqlValue) -> Option<Self>;

    /// Convert, naming `field` in the error.
    fn extract(field: &str, value: &SqlValue) -> Result<Self> {
        Self::from_sql_value(value).ok_or_else(|| StorageError::TypeMismatch {
            field: field.to_string(),
            expected: Self::expected().to_string(),
            found: match value {
                SqlValue::Null(_) => "NULL".to_string(),
                other => other.field_type().to_string(),
            },
        })
    }
}

macro_rules! impl_from_sql_value {
    ($ty:ty, $expected:literal, $($pat:pat => $conv:expr),+ $(,)?) => {
        impl FromSqlValue for $ty {
            fn expected() -> &'static str {
                $expected
            }

            fn from_sql_value(value: &SqlValue) -> Option<Self> {
                match value {
                    $($pat => $conv,)+
                    _ => None,
                }
            }
        }
    };
}

impl_from_sql_value!(bool, "bool", SqlValue::Bool(v) => Some(*v));
impl_from_sql_value!(i32, "i32",
    SqlValue::I32(v) => Some(*v),
    SqlValue::I64(v) => i32::try_from(*v).ok(),
);
impl_from_sql_value!(i64, "i64",
    SqlValue::I64(v) => Some(*v),
    SqlValue::I32(v) => Some(i64::from(*v)),
);
impl_from_sql_value!(f64, "f64",
    SqlValue::F64(v) => Some(*v),
    SqlValue::I32(v) => Some(f64::from(*v)),
);
impl_from_sql_value!(String, "text", SqlValue::Text(v) => Some(v.clone()));
impl_from_sql_value!(Vec<u8>, "bytes", SqlValue::Bytes(v) => Some(v.clone()));
impl_from_sql_value!(Uuid, "uuid", SqlValue::Uuid(v) => Some(*v));
impl_from_sql_value!(NaiveDate, "date", SqlValue::Date(v) => Some(*v));
impl_from_sql_value!(NaiveDateTime, "date_time", SqlValue::DateTime(v) => Some(*v));
impl_from_sql_value!(NaiveTime, "time", SqlValue::Time(v) => Some(*v));

impl FromSqlValue for SqlValue {
    fn expected() -> &'static str {
        "any"
    }

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        Some(value.clone())
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn expected() -> &'static str {
        T::expected()
    }

    fn from_sql_value(value: &SqlValue) -> Option<Self> {
        if value.is_null() {
            Some(None)
        } else {
            T::from_sql_value(value).map(Some)
        }
    }
}

/// Declared type of an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
    Int,
    Text,
    Uuid,
}

impl KeyType {
    /// Field type used to bind and decode keys of this type.
    pub fn field_type(&self) -> FieldType {
        match self {
            KeyType::Int => FieldType::I64,
            KeyType::Text => FieldType::Text,
            KeyType::Uuid => FieldType::Uuid,
        }
    }

    /// Parse a key of this type from text (used by the command line).
    pub fn parse(&self, raw: &str) -> Result<ObjectKey> {
        match self {
            KeyType::Int => raw.parse::<i64>().map(ObjectKey::Int).map_err(|e| {
                StorageError::illegal_argument(format!("'{}' is not an integer key: {}", raw, e))
            }),
            KeyType::Text => Ok(ObjectKey::Text(raw.to_string())),
            KeyType::Uuid => Uuid::parse_str(raw).map(ObjectKey::Uuid).map_err(|e| {
                StorageError::illegal_argument(format!("'{}' is not a uuid key: {}", raw, e))
            }),
        }
    }
}

/// Identity of a stored object.
///
/// Kept apart from the positional value array; it is bound first in inserts
/// and last in updates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKey {
    Int(i64),
    Text(String),
    Uuid(Uuid),
}

impl ObjectKey {
    /// The key type this key belongs to.
    pub fn key_type(&self) -> KeyType {
        match self {
            ObjectKey::Int(_) => KeyType::Int,
            ObjectKey::Text(_) => KeyType::Text,
            ObjectKey::Uuid(_) => KeyType::Uuid,
        }
    }

    /// Recover a key from a decoded column value.
    pub fn from_sql_value(value: SqlValue) -> Result<Self> {
        match value {
            SqlValue::I64(v) => Ok(ObjectKey::Int(v)),
            SqlValue::I32(v) => Ok(ObjectKey::Int(i64::from(v))),
            SqlValue::Text(v) => Ok(ObjectKey::Text(v)),
            SqlValue::Uuid(v) => Ok(ObjectKey::Uuid(v)),
            other => Err(StorageError::illegal_state(format!(
                "cannot use {} as an object key",
                other
            ))),
        }
    }

    /// Convert into a bindable parameter.
    pub fn to_sql_value(&self) -> SqlValue {
        SqlValue::from(self.clone())
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKey::Int(v) => write!(f, "{}", v),
            ObjectKey::Text(v) => write!(f, "{:?}", v),
            ObjectKey::Uuid(v) => write!(f, "{}", v),
        }
    }
}

impl From<i32> for ObjectKey {
    fn from(v: i32) -> Self {
        ObjectKey::Int(i64::from(v))
    }
}

impl From<i64> for ObjectKey {
    fn from(v: i64) -> Self {
        ObjectKey::Int(v)
    }
}

impl From<&str> for ObjectKey {
    fn from(v: &str) -> Self {
        ObjectKey::Text(v.to_string())
    }
}

impl From<String> for ObjectKey {
    fn from(v: String) -> Self {
        ObjectKey::Text(v)
    }
}

impl From<Uuid> for ObjectKey {
    fn from(v: Uuid) -> Self {
        ObjectKey::Uuid(v)
    }
}

/// Render a key list the way storage errors name their subject.
pub(crate) fn format_keys(keys: &[ObjectKey]) -> String {
    let rendered: Vec<String> = keys.iter().map(ToString::to_string).collect();
    format!("[{}]", rendered.join(", "))
}
