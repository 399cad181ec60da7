//! End-to-end tests of the object storage against in-memory SQLite.

use std::sync::Arc;

use chrono::NaiveDate;
use objstore::{
    AsObject, DatabaseConnection, FieldMapping, FieldType, KeyType, ObjectKey, ObjectStorage,
    ObjectType, SqliteConnection, Storable, StorageError, StorageOptions, StoredObject,
};

struct Person(StoredObject);

impl Person {
    fn name(&self) -> String {
        self.0.get("name").unwrap()
    }

    fn age(&self) -> i32 {
        self.0.get("age").unwrap()
    }

    fn birthday(&self) -> NaiveDate {
        self.0.get("birthday").unwrap()
    }
}

impl AsObject for Person {
    fn as_object(&self) -> Option<&StoredObject> {
        Some(&self.0)
    }
}

impl Storable for Person {
    const TYPE_NAME: &'static str = "Person";

    fn object_type() -> ObjectType {
        ObjectType::new("Person", KeyType::Int)
            .field("name", FieldType::Text)
            .field("age", FieldType::I32)
            .field("birthday", FieldType::Date)
    }

    fn from_object(object: StoredObject) -> Self {
        Person(object)
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn seeded_storage() -> ObjectStorage {
    let conn = SqliteConnection::in_memory().await.unwrap();
    sqlx::query(
        "CREATE TABLE Person (id INTEGER PRIMARY KEY, name VARCHAR(255), age INTEGER, birthday DATE)",
    )
    .execute(conn.pool())
    .await
    .unwrap();

    let seed = [
        (1, "Elvis Presley", 42, date(1935, 1, 8)),
        (2, "Jacques Brel", 49, date(1929, 4, 8)),
        (3, "Kyu Sakamoto", 43, date(1941, 11, 10)),
    ];
    for (id, name, age, birthday) in seed {
        sqlx::query("INSERT INTO Person (id, name, age, birthday) VALUES (?1, ?2, ?3, ?4)")
            .bind(id as i64)
            .bind(name)
            .bind(age)
            .bind(birthday)
            .execute(conn.pool())
            .await
            .unwrap();
    }

    let storage = ObjectStorage::new(Arc::new(conn));
    storage.register_type::<Person>().unwrap();
    storage
}

fn new_person(storage: &ObjectStorage, id: i64, name: &str, age: i32) -> StoredObject {
    let mut builder = storage.builder_factory().new_object("Person", id).unwrap();
    builder
        .set("name", name)
        .unwrap()
        .set("age", age)
        .unwrap()
        .set("birthday", date(1950, 6, 1))
        .unwrap();
    builder.build().unwrap()
}

#[tokio::test]
async fn test_get_all_returns_seeded_people() {
    let storage = seeded_storage().await;
    let mut people = storage.get_all_typed::<Person>().await.unwrap();
    people.sort_by_key(|p| p.0.id().clone());

    assert_eq!(people.len(), 3);
    assert_eq!(people[0].name(), "Elvis Presley");
    assert_eq!(people[0].age(), 42);
    assert_eq!(people[0].birthday(), date(1935, 1, 8));
    assert_eq!(people[1].name(), "Jacques Brel");
    assert_eq!(people[2].name(), "Kyu Sakamoto");
    assert_eq!(storage.get_size("Person").await.unwrap(), 3);
}

#[tokio::test]
async fn test_round_trip() {
    let storage = seeded_storage().await;
    let edith = new_person(&storage, 4, "Edith Piaf", 47);

    let persisted = storage.put_all(&[edith.clone()]).await.unwrap();
    assert_eq!(persisted, vec![edith.clone()]);

    let loaded = storage.get("Person", 4).await.unwrap().unwrap();
    assert_eq!(loaded, edith);
}

#[tokio::test]
async fn test_upsert_updates_existing_row_in_place() {
    let storage = seeded_storage().await;
    let kyu = storage.get("Person", 3).await.unwrap().unwrap();

    let mut edit = kyu.modify();
    edit.set("age", 44).unwrap();
    storage.put_all(&[edit.build().unwrap()]).await.unwrap();

    assert_eq!(storage.get_size("Person").await.unwrap(), 3);
    let reloaded: Person = storage.get_typed(3).await.unwrap().unwrap();
    assert_eq!(reloaded.age(), 44);
    assert_eq!(reloaded.name(), "Kyu Sakamoto");
}

#[tokio::test]
async fn test_mixed_batch_inserts_one_and_updates_one() {
    let storage = seeded_storage().await;
    let brel = storage.get("Person", 2).await.unwrap().unwrap();
    let mut edit = storage.builder_factory().new_clone(&brel);
    edit.set("name", "Jacques Romain Georges Brel").unwrap();

    let batch = vec![new_person(&storage, 5, "Serge Gainsbourg", 62), edit.build().unwrap()];
    storage.put_all(&batch).await.unwrap();

    assert_eq!(storage.get_size("Person").await.unwrap(), 4);
    let brel: Person = storage.get_typed(2).await.unwrap().unwrap();
    assert_eq!(brel.name(), "Jacques Romain Georges Brel");
    assert_eq!(brel.age(), 49);
    assert!(storage.contains("Person", 5).await.unwrap());
}

#[tokio::test]
async fn test_unregistered_type_is_illegal_argument() {
    let storage = seeded_storage().await;
    let err = storage.get("Animal", 1).await.unwrap_err();
    assert!(matches!(err, StorageError::IllegalArgument(_)));
    assert!(err.to_string().contains("non-registered type Animal"));
}

#[tokio::test]
async fn test_absent_entries_are_skipped() {
    let storage = seeded_storage().await;
    let batch = vec![
        Some(new_person(&storage, 6, "Dalida", 54)),
        None,
        Some(new_person(&storage, 7, "Barbara", 67)),
    ];

    let persisted = storage.put_all(&batch).await.unwrap();
    assert_eq!(persisted.len(), 2);
    assert_eq!(storage.get_size("Person").await.unwrap(), 5);

    assert_eq!(storage.put(&None::<StoredObject>).await.unwrap(), None);
}

#[tokio::test]
async fn test_remove_then_get_returns_none() {
    let storage = seeded_storage().await;
    let removed = storage.remove("Person", &[ObjectKey::from(1)]).await.unwrap();

    assert_eq!(removed, 1);
    assert_eq!(storage.get_size("Person").await.unwrap(), 2);
    assert!(storage.get("Person", 1).await.unwrap().is_none());
    assert!(!storage.contains("Person", 1).await.unwrap());
}

#[tokio::test]
async fn test_remove_objects_and_remove_all() {
    let storage = seeded_storage().await;
    let some = storage
        .get_some("Person", &[ObjectKey::from(2), ObjectKey::from(3)])
        .await
        .unwrap();
    assert_eq!(some.len(), 2);

    assert_eq!(storage.remove_objects(&some).await.unwrap(), 2);
    assert_eq!(storage.get_size("Person").await.unwrap(), 1);

    assert_eq!(storage.remove_all("Person").await.unwrap(), 1);
    assert!(storage.get_all("Person").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_some_spans_chunks() {
    let conn = SqliteConnection::in_memory().await.unwrap();
    sqlx::query("CREATE TABLE Person (id INTEGER PRIMARY KEY, name TEXT, age INTEGER, birthday DATE)")
        .execute(conn.pool())
        .await
        .unwrap();
    let storage =
        ObjectStorage::new(Arc::new(conn)).with_options(StorageOptions { max_in_list: 2 });
    storage.register_type::<Person>().unwrap();

    let batch: Vec<StoredObject> = (1..=5)
        .map(|id| new_person(&storage, id, "Someone", 20 + id as i32))
        .collect();
    storage.put_all(&batch).await.unwrap();

    let ids: Vec<ObjectKey> = (1..=5_i64).map(ObjectKey::from).collect();
    let found = storage.get_some("Person", &ids).await.unwrap();
    assert_eq!(found.len(), 5);
}

#[tokio::test]
async fn test_failed_batch_leaves_nothing_behind() {
    let storage = seeded_storage().await;
    let conn = storage.connection().clone();
    // A NOT NULL column makes the second insert fail
    conn.write("CREATE TABLE Pet (id INTEGER PRIMARY KEY, name TEXT NOT NULL)", &[])
        .await
        .unwrap();
    storage
        .register(&ObjectType::new("Pet", KeyType::Int).field("name", FieldType::Text))
        .unwrap();

    let factory = storage.builder_factory();
    let rex = factory
        .new_object_with_values("Pet", 1, [("name", "Rex")])
        .unwrap()
        .build()
        .unwrap();
    let nameless = factory.new_object("Pet", 2).unwrap().build().unwrap();

    let err = storage.put_all(&[rex, nameless]).await.unwrap_err();
    assert!(matches!(err, StorageError::Storage { operation: "put_all", .. }));
    assert_eq!(storage.get_size("Pet").await.unwrap(), 0);
}

#[tokio::test]
async fn test_builder_is_finalized_once() {
    let storage = seeded_storage().await;
    let mut builder = storage.builder_factory().new_object("Person", 9).unwrap();
    builder.set("name", "Nobody").unwrap();
    builder.build().unwrap();

    assert!(matches!(
        builder.set("age", 1),
        Err(StorageError::IllegalState(_))
    ));
    assert!(matches!(
        builder.set("id", 10),
        Err(StorageError::IllegalState(_)) | Err(StorageError::IllegalArgument(_))
    ));
}

#[tokio::test]
async fn test_mapping_is_deterministic_across_storages() {
    let a = seeded_storage().await;
    let b = seeded_storage().await;
    let left = a.registry().get("Person").unwrap();
    let right = b.registry().get("Person").unwrap();
    assert_eq!(left.field_names(), right.field_names());
    assert_eq!(
        left.as_ref(),
        &FieldMapping::resolve(&Person::object_type()).unwrap()
    );
}
