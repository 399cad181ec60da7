//! Builder construction for registered types.

use std::sync::Arc;

use crate::core::value::{ObjectKey, SqlValue};
use crate::error::Result;
use crate::mapping::MappingRegistry;

use super::builder::ObjectBuilder;
use super::stored::StoredObject;

/// Creates [`ObjectBuilder`]s for the types registered on one storage.
#[derive(Debug, Clone)]
pub struct ObjectBuilderFactory {
    registry: Arc<MappingRegistry>,
}

impl ObjectBuilderFactory {
    pub fn new(registry: Arc<MappingRegistry>) -> Self {
        Self { registry }
    }

    /// New object with every field unset.
    pub fn new_object(&self, type_name: &str, key: impl Into<ObjectKey>) -> Result<ObjectBuilder> {
        let mapping = self.registry.require(type_name, "new_object")?;
        let key = key.into();
        mapping.check_key(&key)?;
        Ok(ObjectBuilder::empty(mapping, key))
    }

    /// New object under `key` with every field copied from `template`.
    pub fn new_object_from_template(
        &self,
        key: impl Into<ObjectKey>,
        template: &StoredObject,
    ) -> Result<ObjectBuilder> {
        let mapping = Arc::clone(template.mapping());
        let key = key.into();
        mapping.check_key(&key)?;
        Ok(ObjectBuilder::from_parts(mapping, key, template.values().to_vec()))
    }

    /// Edit of an existing object: same key, same values.
    pub fn new_clone(&self, object: &StoredObject) -> ObjectBuilder {
        object.modify()
    }

    /// New object with only the named fields populated.
    ///
    /// # Errors
    ///
    /// `IllegalArgument` for a name that is not a field of the type, and the
    /// errors of [`ObjectBuilder::set`] for each value.
    pub fn new_object_with_values<I, S, V>(
        &self,
        type_name: &str,
        key: impl Into<ObjectKey>,
        values: I,
    ) -> Result<ObjectBuilder>
    where
        I: IntoIterator<Item = (S, V)>,
        S: AsRef<str>,
        V: Into<SqlValue>,
    {
        let mut builder = self.new_object(type_name, key)?;
        for (field, value) in values {
            builder.set(field.as_ref(), value)?;
        }
        Ok(builder)
    }

    /// One empty builder per key, in input order.
    pub fn new_objects<I, K>(&self, type_name: &str, keys: I) -> Result<Vec<ObjectBuilder>>
    where
        I: IntoIterator<Item = K>,
        K: Into<ObjectKey>,
    {
        keys.into_iter()
            .map(|key| self.new_object(type_name, key))
            .collect()
    }

    /// One builder per key, each copied from `template`, in input order.
    pub fn new_objects_from_template<I, K>(
        &self,
        keys: I,
        template: &StoredObject,
    ) -> Result<Vec<ObjectBuilder>>
    where
        I: IntoIterator<Item = K>,
        K: Into<ObjectKey>,
    {
        keys.into_iter()
            .map(|key| self.new_object_from_template(key, template))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::{FieldType, KeyType};
    use crate::error::StorageError;
    use crate::mapping::ObjectType;

    fn factory() -> ObjectBuilderFactory {
        let registry = Arc::new(MappingRegistry::new());
        registry
            .register(
                &ObjectType::new("Person", KeyType::Int)
                    .field("name", FieldType::Text)
                    .field("age", FieldType::I32),
            )
            .unwrap();
        ObjectBuilderFactory::new(registry)
    }

    fn kyu(factory: &ObjectBuilderFactory) -> StoredObject {
        factory
            .new_object_with_values(
                "Person",
                3,
                [
                    ("name", SqlValue::from("Kyu Sakamoto")),
                    ("age", SqlValue::from(43)),
                ],
            )
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_new_object_requires_registration() {
        let f = factory();
        let err = f.new_object("Animal", 1).unwrap_err();
        assert!(matches!(err, StorageError::IllegalArgument(_)));
    }

    #[test]
    fn test_new_object_checks_key_type() {
        let f = factory();
        assert!(f.new_object("Person", "three").is_err());
    }

    #[test]
    fn test_new_object_with_values() {
        let f = factory();
        let object = kyu(&f);
        assert_eq!(object.get::<String>("name").unwrap(), "Kyu Sakamoto");
        assert_eq!(object.get::<i32>("age").unwrap(), 43);

        let err = f
            .new_object_with_values("Person", 4, [("height", 1.7)])
            .unwrap_err();
        assert!(matches!(err, StorageError::IllegalArgument(_)));
    }

    #[test]
    fn test_partial_values_leave_other_fields_null() {
        let f = factory();
        let object = f
            .new_object_with_values("Person", 5, [("age", 20)])
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(object.get::<Option<String>>("name").unwrap(), None);
    }

    #[test]
    fn test_template_copies_values_under_new_key() {
        let f = factory();
        let template = kyu(&f);
        let copy = f
            .new_object_from_template(10, &template)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(copy.id(), &ObjectKey::from(10));
        assert_eq!(copy.values(), template.values());
    }

    #[test]
    fn test_clone_keeps_key() {
        let f = factory();
        let original = kyu(&f);
        let mut edit = f.new_clone(&original);
        edit.set("age", 44).unwrap();
        let edited = edit.build().unwrap();
        assert_eq!(edited.id(), original.id());
        assert_eq!(edited.get::<i32>("age").unwrap(), 44);
        assert_eq!(original.get::<i32>("age").unwrap(), 43);
    }

    #[test]
    fn test_batch_preserves_order_and_allows_duplicates() {
        let f = factory();
        let builders = f.new_objects("Person", [3, 1, 3]).unwrap();
        let ids: Vec<&ObjectKey> = builders.iter().map(ObjectBuilder::id).collect();
        assert_eq!(
            ids,
            vec![&ObjectKey::from(3), &ObjectKey::from(1), &ObjectKey::from(3)]
        );

        let template = kyu(&f);
        let copies = f.new_objects_from_template([7, 8], &template).unwrap();
        assert_eq!(copies.len(), 2);
        assert_eq!(copies[1].get::<String>("name").unwrap(), "Kyu Sakamoto");
    }
}
