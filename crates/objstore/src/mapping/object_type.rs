//! Declarative description of a storable type.
//!
//! An [`ObjectType`] lists the accessor surface of a domain type the way the
//! type would expose it (`getName`, `isActive`, `getId`, ...). It is built
//! once, either by hand, from a [`Storable`](crate::object::Storable)
//! implementation or from YAML, and then resolved into a
//! [`FieldMapping`](super::FieldMapping) at registration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::value::{FieldType, KeyType};

/// One accessor-style operation of a storable type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accessor {
    /// Accessor name, e.g. `getAge` or `isRetired`.
    pub name: String,
    /// Declared return type.
    pub returns: FieldType,
    /// Static operations are never fields.
    #[serde(default, rename = "static")]
    pub is_static: bool,
}

/// Description of a storable type: table, identity and accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TypeDeclaration")]
pub struct ObjectType {
    pub name: String,
    pub schema: Option<String>,
    pub key_column: String,
    pub key_type: KeyType,
    pub accessors: Vec<Accessor>,
}

impl ObjectType {
    /// Start a type with an `id` identity of the given key type.
    pub fn new(name: impl Into<String>, key_type: KeyType) -> Self {
        Self {
            name: name.into(),
            schema: None,
            key_column: default_key_column(),
            key_type,
            accessors: Vec::new(),
        }
    }

    /// Place the table in a schema.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Use a different identity column than `id`.
    pub fn with_key_column(mut self, column: impl Into<String>) -> Self {
        self.key_column = column.into();
        self
    }

    /// Declare an instance accessor.
    pub fn accessor(mut self, name: impl Into<String>, returns: FieldType) -> Self {
        self.accessors.push(Accessor {
            name: name.into(),
            returns,
            is_static: false,
        });
        self
    }

    /// Declare a static accessor (never mapped to a field).
    pub fn static_accessor(mut self, name: impl Into<String>, returns: FieldType) -> Self {
        self.accessors.push(Accessor {
            name: name.into(),
            returns,
            is_static: true,
        });
        self
    }

    /// Declare a field by name; adds the conventional accessor for it
    /// (`isX` for booleans, `getX` otherwise).
    pub fn field(self, name: &str, field_type: FieldType) -> Self {
        let prefix = if field_type == FieldType::Bool { "is" } else { "get" };
        let accessor = format!("{}{}", prefix, capitalize(name));
        self.accessor(accessor, field_type)
    }

    /// Name of the accessor that returns the identity.
    pub fn identity_accessor(&self) -> String {
        format!("get{}", capitalize(&self.key_column))
    }
}

pub(crate) fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn default_key_column() -> String {
    "id".to_string()
}

fn default_key_type() -> KeyType {
    KeyType::Int
}

/// YAML shape of a type declaration.
///
/// `fields` is shorthand for the conventional accessors; both may be given.
#[derive(Debug, Clone, Deserialize)]
struct TypeDeclaration {
    name: String,
    #[serde(default)]
    schema: Option<String>,
    #[serde(default)]
    key: KeyDeclaration,
    #[serde(default)]
    accessors: Vec<Accessor>,
    #[serde(default)]
    fields: BTreeMap<String, FieldType>,
}

#[derive(Debug, Clone, Deserialize)]
struct KeyDeclaration {
    #[serde(default = "default_key_column")]
    column: String,
    #[serde(rename = "type", default = "default_key_type")]
    key_type: KeyType,
}

impl Default for KeyDeclaration {
    fn default() -> Self {
        Self {
            column: default_key_column(),
            key_type: default_key_type(),
        }
    }
}

impl From<TypeDeclaration> for ObjectType {
    fn from(decl: TypeDeclaration) -> Self {
        let mut object_type = ObjectType::new(decl.name, decl.key.key_type)
            .with_key_column(decl.key.column);
        object_type.schema = decl.schema;
        object_type.accessors = decl.accessors;
        for (name, field_type) in &decl.fields {
            object_type = object_type.field(name, *field_type);
        }
        object_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_adds_conventional_accessor() {
        let t = ObjectType::new("Person", KeyType::Int)
            .field("name", FieldType::Text)
            .field("retired", FieldType::Bool);
        let names: Vec<&str> = t.accessors.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["getName", "isRetired"]);
    }

    #[test]
    fn test_identity_accessor_follows_key_column() {
        let t = ObjectType::new("Person", KeyType::Int);
        assert_eq!(t.identity_accessor(), "getId");
        let t = t.with_key_column("code");
        assert_eq!(t.identity_accessor(), "getCode");
    }

    #[test]
    fn test_deserialize_declaration() {
        let yaml = r#"
name: Person
schema: people
key:
  type: int
fields:
  name: text
  age: i32
accessors:
  - name: getInstanceCount
    returns: i64
    static: true
"#;
        let t: ObjectType = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(t.name, "Person");
        assert_eq!(t.schema.as_deref(), Some("people"));
        assert_eq!(t.key_column, "id");
        assert_eq!(t.key_type, KeyType::Int);
        assert_eq!(t.accessors.len(), 3);
        assert!(t.accessors[0].is_static);
    }
}
