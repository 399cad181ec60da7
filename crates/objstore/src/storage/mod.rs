//! Object storage - the public entry point.
//!
//! [`ObjectStorage`] ties the mapping registry, the SQL generator and an
//! execution surface together:
//!
//! - reads build the matching statement, run it and materialize each row
//! - `put_all` is a batched upsert inside one serializable transaction
//! - deletes are single non-transactional statements
//!
//! Every failure of the execution surface is wrapped in
//! [`StorageError::Storage`] naming the operation, the type and the keys
//! involved.

mod trigger;

pub use trigger::Trigger;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{Config, StorageConfig};
use crate::core::traits::{DatabaseConnection, DatabaseTransaction, IsolationLevel};
use crate::core::value::{format_keys, FieldType, ObjectKey, SqlValue};
use crate::drivers::SqliteConnection;
use crate::error::{Result, StorageError};
use crate::mapping::{FieldMapping, MappingRegistry, ObjectType, TableMapping};
use crate::object::{
    AsObject, ImmutableObjectFactory, ObjectBuilderFactory, ObjectFactory, Storable, StoredObject,
};

/// Tunables of an [`ObjectStorage`].
#[derive(Debug, Clone)]
pub struct StorageOptions {
    /// Largest identity IN-list issued per read statement.
    pub max_in_list: usize,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self { max_in_list: 500 }
    }
}

impl From<&StorageConfig> for StorageOptions {
    fn from(config: &StorageConfig) -> Self {
        Self {
            max_in_list: config.max_in_list.max(1),
        }
    }
}

/// Storage for registered object types.
pub struct ObjectStorage {
    connection: Arc<dyn DatabaseConnection>,
    registry: Arc<MappingRegistry>,
    object_factory: Arc<dyn ObjectFactory>,
    options: StorageOptions,
    trigger: Option<Arc<dyn Trigger>>,
}

impl ObjectStorage {
    /// Create a storage over an execution surface.
    pub fn new(connection: Arc<dyn DatabaseConnection>) -> Self {
        Self {
            connection,
            registry: Arc::new(MappingRegistry::new()),
            object_factory: Arc::new(ImmutableObjectFactory),
            options: StorageOptions::default(),
            trigger: None,
        }
    }

    /// Open the configured database and register every declared type.
    pub async fn connect(config: &Config) -> Result<Self> {
        let connection = SqliteConnection::connect(&config.database).await?;
        let storage = Self::new(Arc::new(connection)).with_options((&config.storage).into());
        for object_type in &config.types {
            storage.register(object_type)?;
        }
        info!(
            "Object storage ready with {} registered types",
            config.types.len()
        );
        Ok(storage)
    }

    pub fn with_options(mut self, options: StorageOptions) -> Self {
        self.options = StorageOptions {
            max_in_list: options.max_in_list.max(1),
        };
        self
    }

    /// Replace the factory used to materialize result rows.
    pub fn with_object_factory(mut self, factory: Arc<dyn ObjectFactory>) -> Self {
        self.object_factory = factory;
        self
    }

    pub fn with_trigger(mut self, trigger: Arc<dyn Trigger>) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn connection(&self) -> &Arc<dyn DatabaseConnection> {
        &self.connection
    }

    pub fn registry(&self) -> &Arc<MappingRegistry> {
        &self.registry
    }

    pub fn options(&self) -> &StorageOptions {
        &self.options
    }

    /// Register a type. The first registration of a name wins.
    pub fn register(&self, object_type: &ObjectType) -> Result<Arc<FieldMapping>> {
        self.registry.register(object_type)
    }

    /// Register the type behind a typed view.
    pub fn register_type<T: Storable>(&self) -> Result<Arc<FieldMapping>> {
        let object_type = T::object_type();
        if object_type.name != T::TYPE_NAME {
            return Err(StorageError::illegal_argument(format!(
                "{} declares its table as {}",
                T::TYPE_NAME,
                object_type.name
            )));
        }
        self.register(&object_type)
    }

    /// Builder factory bound to this storage's registry.
    pub fn builder_factory(&self) -> ObjectBuilderFactory {
        ObjectBuilderFactory::new(Arc::clone(&self.registry))
    }

    /// Generated statements for a registered type in this storage's dialect.
    pub fn table_mapping(&self, type_name: &str) -> Result<Arc<TableMapping>> {
        let mapping = self.registry.require(type_name, "table_mapping")?;
        Ok(self
            .registry
            .table_mapping(&mapping, &self.connection.dialect()))
    }

    fn resolve(
        &self,
        type_name: &str,
        operation: &'static str,
    ) -> Result<(Arc<FieldMapping>, Arc<TableMapping>)> {
        let mapping = self.registry.require(type_name, operation)?;
        let table = self
            .registry
            .table_mapping(&mapping, &self.connection.dialect());
        Ok((mapping, table))
    }

    // ===== Reads =====

    /// Object with the given identity, if it exists.
    pub async fn get(
        &self,
        type_name: &str,
        id: impl Into<ObjectKey>,
    ) -> Result<Option<StoredObject>> {
        let id = id.into();
        let (mapping, table) = self.resolve(type_name, "get")?;
        mapping.check_key(&id)?;
        let subject = format!(" and {{id={}}}", id);
        let mut found = self
            .fetch_some(&mapping, &table, std::slice::from_ref(&id))
            .await
            .map_err(|e| StorageError::storage("get", type_name, subject, e))?;
        Ok(found.pop())
    }

    /// Objects with the given identities, in the order the database returns
    /// them. Missing identities are skipped.
    pub async fn get_some(&self, type_name: &str, ids: &[ObjectKey]) -> Result<Vec<StoredObject>> {
        let (mapping, table) = self.resolve(type_name, "get_some")?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        for id in ids {
            mapping.check_key(id)?;
        }
        let subject = format!(" and {{ids={}}}", format_keys(ids));
        self.fetch_some(&mapping, &table, ids)
            .await
            .map_err(|e| StorageError::storage("get_some", type_name, subject, e))
    }

    /// Every stored object of a type.
    pub async fn get_all(&self, type_name: &str) -> Result<Vec<StoredObject>> {
        let (mapping, table) = self.resolve(type_name, "get_all")?;
        let fetched = async {
            let rows = self
                .connection
                .query(&table.select_all(), &[], &mapping.row_shape())
                .await?;
            self.materialize(&mapping, rows)
        };
        fetched
            .await
            .map_err(|e| StorageError::storage("get_all", type_name, "", e))
    }

    /// Number of stored objects of a type.
    pub async fn get_size(&self, type_name: &str) -> Result<u64> {
        let (_, table) = self.resolve(type_name, "get_size")?;
        let counted = async {
            let rows = self
                .connection
                .query(&table.select_count(), &[], &[FieldType::I64])
                .await?;
            match rows.first().and_then(|row| row.first()) {
                Some(SqlValue::I64(count)) => Ok(u64::try_from(*count).unwrap_or(0)),
                other => Err(StorageError::Execution(format!(
                    "unexpected count result: {:?}",
                    other
                ))),
            }
        };
        counted
            .await
            .map_err(|e| StorageError::storage("get_size", type_name, "", e))
    }

    /// Whether an object with the given identity exists.
    pub async fn contains(&self, type_name: &str, id: impl Into<ObjectKey>) -> Result<bool> {
        let id = id.into();
        let (mapping, table) = self.resolve(type_name, "contains")?;
        mapping.check_key(&id)?;
        let subject = format!(" and {{id={}}}", id);
        let checked = async {
            let rows = self
                .connection
                .query(
                    &table.select_keys(1)?,
                    &[id.to_sql_value()],
                    &[mapping.key_type().field_type()],
                )
                .await?;
            Ok::<_, StorageError>(!rows.is_empty())
        };
        checked
            .await
            .map_err(|e| StorageError::storage("contains", type_name, subject, e))
    }

    /// Whether the object's identity exists. An absent object is never
    /// contained.
    pub async fn contains_object<O: AsObject + ?Sized>(&self, object: &O) -> Result<bool> {
        match object.as_object() {
            Some(object) => self.contains(object.type_name(), object.id().clone()).await,
            None => Ok(false),
        }
    }

    /// Typed variant of [`get`](Self::get).
    pub async fn get_typed<T: Storable>(&self, id: impl Into<ObjectKey>) -> Result<Option<T>> {
        match self.get(T::TYPE_NAME, id).await? {
            Some(object) => object.into_typed().map(Some),
            None => Ok(None),
        }
    }

    /// Typed variant of [`get_all`](Self::get_all).
    pub async fn get_all_typed<T: Storable>(&self) -> Result<Vec<T>> {
        self.get_all(T::TYPE_NAME)
            .await?
            .into_iter()
            .map(StoredObject::into_typed)
            .collect()
    }

    async fn fetch_some(
        &self,
        mapping: &Arc<FieldMapping>,
        table: &TableMapping,
        ids: &[ObjectKey],
    ) -> Result<Vec<StoredObject>> {
        let shape = mapping.row_shape();
        let mut objects = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(self.options.max_in_list) {
            let params: Vec<SqlValue> = chunk.iter().map(ObjectKey::to_sql_value).collect();
            let rows = self
                .connection
                .query(&table.select_some(chunk.len())?, &params, &shape)
                .await?;
            objects.extend(self.materialize(mapping, rows)?);
        }
        Ok(objects)
    }

    fn materialize(
        &self,
        mapping: &Arc<FieldMapping>,
        rows: Vec<Vec<SqlValue>>,
    ) -> Result<Vec<StoredObject>> {
        rows.into_iter()
            .map(|row| self.object_factory.materialize(mapping, row))
            .collect()
    }

    // ===== Writes =====

    /// Insert or update one object. An absent object is a no-op.
    pub async fn put<O: AsObject + ?Sized>(&self, object: &O) -> Result<Option<StoredObject>> {
        match object.as_object() {
            Some(object) => Ok(self.put_all(&[object]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Insert new objects and update existing ones in one transaction.
    ///
    /// Absent entries are skipped; an empty batch does no I/O. All objects
    /// must belong to the same registered type and carry distinct
    /// identities. Returns the persisted objects in input order.
    ///
    /// # Errors
    ///
    /// - `IllegalArgument` for an unregistered or mixed-type batch, or a
    ///   repeated identity
    /// - `Storage` when any statement fails; nothing is persisted
    pub async fn put_all<O: AsObject>(&self, objects: &[O]) -> Result<Vec<StoredObject>> {
        let present: Vec<&StoredObject> = objects.iter().filter_map(AsObject::as_object).collect();
        let Some(first) = present.first() else {
            return Ok(Vec::new());
        };

        let type_name = first.type_name().to_string();
        let (mapping, table) = self.resolve(&type_name, "put_all")?;
        check_batch(&mapping, &present)?;

        if let Some(trigger) = &self.trigger {
            for object in &present {
                trigger.on_before_persist(object);
            }
        }

        let keys: Vec<ObjectKey> = present.iter().map(|o| o.id().clone()).collect();
        let wrap = |e| {
            StorageError::storage(
                "put_all",
                type_name.as_str(),
                format!(" and {{objects={}}}", format_keys(&keys)),
                e,
            )
        };

        let mut tx = self
            .connection
            .begin_transaction(IsolationLevel::Serializable)
            .await
            .map_err(wrap)?;

        let outcome = self.upsert(tx.as_mut(), &mapping, &table, &present).await;
        match outcome {
            Ok(()) => tx.commit().await.map_err(wrap)?,
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback of {} put_all failed: {}", type_name, rollback_err);
                }
                return Err(wrap(e));
            }
        }

        if let Some(trigger) = &self.trigger {
            for object in &present {
                trigger.on_after_persist(object);
            }
        }

        Ok(present.into_iter().cloned().collect())
    }

    /// Existence check, partition and the two batched writes, all inside
    /// `tx`.
    async fn upsert(
        &self,
        tx: &mut dyn DatabaseTransaction,
        mapping: &FieldMapping,
        table: &TableMapping,
        objects: &[&StoredObject],
    ) -> Result<()> {
        let key_shape = [mapping.key_type().field_type()];
        let mut existing = HashSet::new();
        let keys: Vec<SqlValue> = objects.iter().map(|o| o.id().to_sql_value()).collect();
        for chunk in keys.chunks(self.options.max_in_list) {
            let rows = tx
                .query(&table.select_keys(chunk.len())?, chunk, &key_shape)
                .await?;
            for value in rows.into_iter().flatten() {
                existing.insert(ObjectKey::from_sql_value(value)?);
            }
        }

        let (to_update, to_insert): (Vec<&StoredObject>, Vec<&StoredObject>) =
            objects.iter().copied().partition(|o| existing.contains(o.id()));
        debug!(
            "{} put_all: {} to insert, {} to update",
            mapping.type_name(),
            to_insert.len(),
            to_update.len()
        );

        if !to_insert.is_empty() {
            let rows: Vec<Vec<SqlValue>> = to_insert
                .iter()
                .map(|o| {
                    std::iter::once(o.id().to_sql_value())
                        .chain(o.values().iter().cloned())
                        .collect()
                })
                .collect();
            tx.batch_write(&table.insert(), &rows).await?;
        }

        if !to_update.is_empty() {
            // Types without fields have nothing to update
            if let Some(sql) = table.update() {
                let rows: Vec<Vec<SqlValue>> = to_update
                    .iter()
                    .map(|o| {
                        o.values()
                            .iter()
                            .cloned()
                            .chain(std::iter::once(o.id().to_sql_value()))
                            .collect()
                    })
                    .collect();
                tx.batch_write(&sql, &rows).await?;
            }
        }

        Ok(())
    }

    /// Delete objects by identity in a single statement.
    ///
    /// [`Trigger::on_delete`] fires for every requested id once the
    /// statement removed at least one row.
    pub async fn remove(&self, type_name: &str, ids: &[ObjectKey]) -> Result<u64> {
        let (mapping, table) = self.resolve(type_name, "remove")?;
        if ids.is_empty() {
            return Ok(0);
        }
        for id in ids {
            mapping.check_key(id)?;
        }

        let subject = format!(" and {{ids={}}}", format_keys(ids));
        let removed = async {
            let params: Vec<SqlValue> = ids.iter().map(ObjectKey::to_sql_value).collect();
            self.connection
                .write(&table.delete(ids.len())?, &params)
                .await
        };
        let count = removed
            .await
            .map_err(|e| StorageError::storage("remove", type_name, subject, e))?;
        debug!("{} remove: {} rows deleted", type_name, count);

        // One statement cannot tell which ids matched, so the hook reports
        // the requested ids of a delete that removed anything.
        if count > 0 {
            if let Some(trigger) = &self.trigger {
                for id in ids {
                    trigger.on_delete(type_name, id);
                }
            }
        }
        Ok(count)
    }

    /// Delete the given objects by their identities. Absent entries are
    /// skipped.
    pub async fn remove_objects<O: AsObject>(&self, objects: &[O]) -> Result<u64> {
        let present: Vec<&StoredObject> = objects.iter().filter_map(AsObject::as_object).collect();
        let Some(first) = present.first() else {
            return Ok(0);
        };
        let type_name = first.type_name().to_string();
        if let Some(other) = present.iter().find(|o| o.type_name() != type_name) {
            return Err(mixed_batch("remove_objects", &type_name, other));
        }
        let ids: Vec<ObjectKey> = present.iter().map(|o| o.id().clone()).collect();
        self.remove(&type_name, &ids).await
    }

    /// Delete every object of a type.
    pub async fn remove_all(&self, type_name: &str) -> Result<u64> {
        let (_, table) = self.resolve(type_name, "remove_all")?;
        let count = self
            .connection
            .write(&table.delete_all(), &[])
            .await
            .map_err(|e| StorageError::storage("remove_all", type_name, "", e))?;
        info!("{} remove_all: {} rows deleted", type_name, count);
        Ok(count)
    }
}

fn check_batch(mapping: &FieldMapping, objects: &[&StoredObject]) -> Result<()> {
    let mut seen = HashSet::with_capacity(objects.len());
    for object in objects {
        if object.type_name() != mapping.type_name() {
            return Err(mixed_batch("put_all", mapping.type_name(), object));
        }
        if object.mapping().as_ref() != mapping {
            return Err(StorageError::illegal_argument(format!(
                "{} was built for a different {} mapping than the registered one",
                object,
                mapping.type_name()
            )));
        }
        if !seen.insert(object.id()) {
            return Err(StorageError::illegal_argument(format!(
                "Cannot call ObjectStorage::put_all(...) with {} more than once",
                object
            )));
        }
    }
    Ok(())
}

fn mixed_batch(operation: &str, type_name: &str, other: &StoredObject) -> StorageError {
    StorageError::illegal_argument(format!(
        "Cannot call ObjectStorage::{}(...) with a batch mixing {} and {}",
        operation,
        type_name,
        other.type_name()
    ))
}
