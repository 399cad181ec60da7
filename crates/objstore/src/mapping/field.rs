//! Field mapping: the ordered, positional schema of a storable type.
//!
//! Resolution walks the accessor surface of an [`ObjectType`] once:
//!
//! 1. static accessors and the identity accessor are skipped
//! 2. `get…` and `is…` accessors become fields; the field name is the
//!    accessor suffix with its first character lower-cased
//! 3. field names are sorted lexicographically and numbered from 0
//!
//! The resulting indices are a positional contract for value arrays and for
//! every generated statement, so resolution must never depend on the order
//! in which accessors were declared.

use std::collections::{BTreeMap, HashMap};

use crate::core::identifier::validate_identifier;
use crate::core::value::{FieldType, KeyType, ObjectKey};
use crate::error::{Result, StorageError};

use super::object_type::ObjectType;

/// Resolved schema of a registered type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMapping {
    type_name: String,
    schema: Option<String>,
    key_column: String,
    key_type: KeyType,
    identity_accessor: String,
    names: Vec<String>,
    types: Vec<FieldType>,
    indices: HashMap<String, usize>,
}

impl FieldMapping {
    /// Resolve the field mapping of a type.
    ///
    /// # Errors
    ///
    /// `IllegalArgument` when an identifier is invalid, when two accessors
    /// derive the same field with different types, or when a field collides
    /// with the identity column.
    pub fn resolve(object_type: &ObjectType) -> Result<Self> {
        validate_identifier(&object_type.name)?;
        if let Some(schema) = &object_type.schema {
            validate_identifier(schema)?;
        }
        validate_identifier(&object_type.key_column)?;

        let identity_accessor = object_type.identity_accessor();
        let mut fields: BTreeMap<String, FieldType> = BTreeMap::new();

        for accessor in &object_type.accessors {
            if accessor.is_static || accessor.name == identity_accessor {
                continue;
            }
            if !accessor.name.starts_with("get") && !accessor.name.starts_with("is") {
                continue;
            }
            let Some(field_name) = Self::field_name_of(&accessor.name) else {
                continue;
            };

            validate_identifier(&field_name)?;
            if field_name == object_type.key_column {
                return Err(StorageError::illegal_argument(format!(
                    "Accessor {} of {} maps onto the identity column '{}'",
                    accessor.name, object_type.name, field_name
                )));
            }

            match fields.get(&field_name) {
                Some(existing) if *existing != accessor.returns => {
                    return Err(StorageError::illegal_argument(format!(
                        "Field '{}' of {} is declared as both {} and {}",
                        field_name, object_type.name, existing, accessor.returns
                    )));
                }
                Some(_) => {}
                None => {
                    fields.insert(field_name, accessor.returns);
                }
            }
        }

        let names: Vec<String> = fields.keys().cloned().collect();
        let types: Vec<FieldType> = fields.values().copied().collect();
        let indices = names
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), index))
            .collect();

        Ok(Self {
            type_name: object_type.name.clone(),
            schema: object_type.schema.clone(),
            key_column: object_type.key_column.clone(),
            key_type: object_type.key_type,
            identity_accessor,
            names,
            types,
            indices,
        })
    }

    /// Derive the field name an accessor or setter refers to.
    ///
    /// `getAge`, `setAge` and `isAge` all yield `age`; anything without one
    /// of those prefixes, or with nothing after it, yields `None`.
    pub fn field_name_of(accessor: &str) -> Option<String> {
        let suffix = ["get", "set", "is"]
            .iter()
            .find_map(|prefix| accessor.strip_prefix(prefix))?;
        let mut chars = suffix.chars();
        let first = chars.next()?;
        Some(first.to_lowercase().chain(chars).collect())
    }

    /// Name of the registered type (also the table name).
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Schema the table lives in, if any.
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Identity column name.
    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    /// Identity type.
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Accessor that returns the identity rather than a field.
    pub fn identity_accessor(&self) -> &str {
        &self.identity_accessor
    }

    /// Field names in index order.
    pub fn field_names(&self) -> &[String] {
        &self.names
    }

    /// Field types, aligned with [`field_names`](Self::field_names).
    pub fn field_types(&self) -> &[FieldType] {
        &self.types
    }

    /// Number of mapped fields (the identity is not counted).
    pub fn field_count(&self) -> usize {
        self.names.len()
    }

    /// Type of the field at `index`.
    pub fn field_type(&self, index: usize) -> Option<FieldType> {
        self.types.get(index).copied()
    }

    /// Index of a field.
    ///
    /// # Errors
    ///
    /// `IllegalArgument` for a name that is not a field of this type.
    pub fn field_index(&self, field: &str) -> Result<usize> {
        self.indices.get(field).copied().ok_or_else(|| {
            StorageError::illegal_argument(format!(
                "Unknown field '{}' for type {}",
                field, self.type_name
            ))
        })
    }

    /// Index of the field an accessor reads.
    pub fn accessor_index(&self, accessor: &str) -> Result<usize> {
        let field = Self::field_name_of(accessor).ok_or_else(|| {
            StorageError::illegal_argument(format!(
                "'{}' is not an accessor of type {}",
                accessor, self.type_name
            ))
        })?;
        self.field_index(&field)
    }

    /// Check that a key has this type's key type.
    pub fn check_key(&self, key: &ObjectKey) -> Result<()> {
        if key.key_type() != self.key_type {
            return Err(StorageError::illegal_argument(format!(
                "{} keys are {:?}, got {}",
                self.type_name, self.key_type, key
            )));
        }
        Ok(())
    }

    /// Column shape of a full row: the identity followed by every field.
    pub fn row_shape(&self) -> Vec<FieldType> {
        let mut shape = Vec::with_capacity(self.names.len() + 1);
        shape.push(self.key_type.field_type());
        shape.extend_from_slice(&self.types);
        shape
    }
}
