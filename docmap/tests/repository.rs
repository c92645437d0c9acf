use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bson::{Bson, Document, doc, oid::ObjectId};
use docmap::{memory::InMemoryStore, prelude::*};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: Option<String>,
    username: String,
}

impl User {
    fn new(username: &str) -> Self {
        Self { id: None, username: username.to_string() }
    }
}

/// Driver double that records every call and answers from canned data, or fails every call
/// with `fail_with` when set.
#[derive(Debug, Default)]
struct RecordingDriver {
    collections: Vec<String>,
    found: Vec<Document>,
    fail_with: Option<fn() -> DocumentStoreError>,
    calls: Mutex<Vec<(String, Document)>>,
}

impl RecordingDriver {
    fn with_collections(names: &[&str]) -> Self {
        Self {
            collections: names.iter().map(|n| n.to_string()).collect(),
            ..Default::default()
        }
    }

    fn with_found(found: Vec<Document>) -> Self {
        Self { found, ..Default::default() }
    }

    fn failing(fail_with: fn() -> DocumentStoreError) -> Self {
        Self {
            collections: vec!["users".to_string()],
            fail_with: Some(fail_with),
            ..Default::default()
        }
    }

    fn record(&self, call: &str, document: Document) -> DocumentStoreResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push((call.to_string(), document));

        match self.fail_with {
            Some(fail) => Err(fail()),
            None => Ok(()),
        }
    }

    fn calls(&self) -> Vec<(String, Document)> {
        self.calls.lock().unwrap().clone()
    }

    fn call_names(&self) -> Vec<String> {
        self.calls().into_iter().map(|(name, _)| name).collect()
    }
}

#[async_trait]
impl StoreDriver for RecordingDriver {
    async fn count(&self, _collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        self.record("count", filter)?;
        Ok(0)
    }

    async fn delete_many(&self, _collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        self.record("delete_many", filter)?;
        Ok(0)
    }

    async fn insert_one(&self, _collection: &str, document: Document) -> DocumentStoreResult<Bson> {
        self.record("insert_one", document)?;
        Ok(Bson::ObjectId(ObjectId::new()))
    }

    async fn find(
        &self,
        _collection: &str,
        filter: Document,
        _options: FindOptions,
    ) -> DocumentStoreResult<Vec<Document>> {
        self.record("find", filter)?;
        Ok(self.found.clone())
    }

    async fn find_one(
        &self,
        _collection: &str,
        filter: Document,
        _options: FindOptions,
    ) -> DocumentStoreResult<Option<Document>> {
        self.record("find_one", filter)?;
        Ok(self.found.first().cloned())
    }

    async fn update_many(
        &self,
        _collection: &str,
        filter: Document,
        update: Document,
    ) -> DocumentStoreResult<u64> {
        self.record("update_many", doc! { "filter": filter, "update": update })?;
        Ok(0)
    }

    async fn list_collections(&self, name: &str) -> DocumentStoreResult<Vec<CollectionDescriptor>> {
        self.record("list_collections", doc! { "name": name })?;
        Ok(
            self.collections
                .iter()
                .filter(|collection| collection.as_str() == name)
                .map(CollectionDescriptor::new)
                .collect()
        )
    }

    async fn drop_collection(&self, collection: &str) -> DocumentStoreResult<()> {
        self.record("drop_collection", doc! { "name": collection })?;
        Ok(())
    }
}

fn users<B: StoreDriver>(driver: B) -> Repository<B, User> {
    RepositoryBuilder::new(driver, "users")
        .rename("_id", "id")
        .rename("usr_name", "username")
        .id_field("_id")
        .build()
        .unwrap()
}

fn raw<B: StoreDriver>(driver: B) -> Repository<B, Document> {
    RepositoryBuilder::new(driver, "users")
        .rename("_id", "id")
        .rename("usr_name", "username")
        .id_field("_id")
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_insert_then_select_one_by_string_id() {
    let store = InMemoryStore::new();
    let users = users(&store);

    let id = users.insert(&User::new("ann")).await.unwrap();
    let oid = ObjectId::parse_str(&id).unwrap();

    let stored = store
        .find_one("users", doc! {}, FindOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, doc! { "_id": oid, "usr_name": "ann" });

    let ann = users
        .select_one(Some(&doc! { "id": id.as_str() }), None)
        .await
        .unwrap();
    assert_eq!(ann, Some(User { id: Some(id), username: "ann".to_string() }));
}

#[tokio::test]
async fn test_insert_omits_null_primary_id() {
    let driver = RecordingDriver::default();

    let id = users(&driver).insert(&User::new("ann")).await.unwrap();

    let calls = driver.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], ("insert_one".to_string(), doc! { "usr_name": "ann" }));
    assert_eq!(id.len(), 24);
}

#[tokio::test]
async fn test_insert_with_malformed_id_fails_before_driver() {
    let driver = RecordingDriver::default();
    let user = User { id: Some("not-an-id".to_string()), username: "ann".to_string() };

    let result = users(&driver).insert(&user).await;

    assert!(matches!(result, Err(DocumentStoreError::InvalidIdentifier(_))));
    assert!(driver.calls().is_empty());
}

#[tokio::test]
async fn test_filters_are_renamed_and_coerced() {
    let oid = ObjectId::new();
    let driver = RecordingDriver::default();
    let users = users(&driver);

    users.select_one(Some(&doc! { "id": oid.to_hex() }), None).await.unwrap();
    users.count(&doc! { "username": "ann" }).await.unwrap();
    users.delete(&doc! { "id": { "$in": [oid.to_hex()] } }).await.unwrap();

    assert_eq!(
        driver.calls(),
        vec![
            ("find_one".to_string(), doc! { "_id": oid }),
            ("count".to_string(), doc! { "usr_name": "ann" }),
            ("delete_many".to_string(), doc! { "_id": { "$in": [oid] } }),
        ]
    );
}

#[tokio::test]
async fn test_select_returns_application_names() {
    let oid = ObjectId::new();
    let driver = RecordingDriver::with_found(vec![
        doc! { "_id": oid, "usr_name": "ann", "age": 31 },
    ]);

    let records = raw(&driver).select(None, None).await.unwrap();

    assert_eq!(records, vec![doc! { "id": oid.to_hex(), "username": "ann", "age": 31 }]);
    assert!(records.iter().all(|r| !r.contains_key("_id") && !r.contains_key("usr_name")));
    assert_eq!(driver.calls(), vec![("find".to_string(), doc! {})]);
}

#[tokio::test]
async fn test_select_one_absent_is_none() {
    let store = InMemoryStore::new();

    let found = users(&store)
        .select_one(Some(&doc! { "username": "nobody" }), None)
        .await
        .unwrap();

    assert!(found.is_none());
}

#[tokio::test]
async fn test_select_passes_options_through() {
    let store = InMemoryStore::new();
    let users = users(&store);

    for name in ["cid", "ann", "bob"] {
        users.insert(&User::new(name)).await.unwrap();
    }

    let page = users
        .select(
            None,
            Some(
                FindOptions::builder()
                    .sort("usr_name", SortDirection::Asc)
                    .limit(2)
                    .build(),
            ),
        )
        .await
        .unwrap();

    let names = page.iter().map(|u| u.username.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["ann", "bob"]);
    assert!(page.iter().all(|u| u.id.is_some()));
}

#[tokio::test]
async fn test_count_delete_and_update() {
    let store = InMemoryStore::new();
    let users = users(&store);

    let ann = users.insert(&User::new("ann")).await.unwrap();
    users.insert(&User::new("bob")).await.unwrap();

    assert_eq!(users.count(&doc! {}).await.unwrap(), 2);
    assert_eq!(users.count(&doc! { "id": ann.as_str() }).await.unwrap(), 1);

    // Update values are passed through in stored form
    let modified = users
        .update(&doc! { "id": ann.as_str() }, &doc! { "$set": { "usr_name": "anna" } })
        .await
        .unwrap();
    assert_eq!(modified, 1);

    let anna = users.select_one(Some(&doc! { "id": ann.as_str() }), None).await.unwrap().unwrap();
    assert_eq!(anna.username, "anna");

    assert_eq!(users.delete(&doc! { "username": "bob" }).await.unwrap(), 1);
    assert_eq!(users.count(&doc! {}).await.unwrap(), 1);
    assert_eq!(users.delete(&doc! { "username": "bob" }).await.unwrap(), 0);
}

#[tokio::test]
async fn test_update_values_are_not_remapped() {
    let driver = RecordingDriver::default();

    users(&driver)
        .update(&doc! { "username": "ann" }, &doc! { "$set": { "username": "anna" } })
        .await
        .unwrap();

    assert_eq!(
        driver.calls(),
        vec![(
            "update_many".to_string(),
            doc! {
                "filter": { "usr_name": "ann" },
                "update": { "$set": { "username": "anna" } },
            },
        )]
    );
}

fn connection_reset() -> DocumentStoreError {
    DocumentStoreError::Backend("connection reset".to_string())
}

fn is_connection_reset<T>(result: &DocumentStoreResult<T>) -> bool {
    matches!(result, Err(DocumentStoreError::Backend(msg)) if msg == "connection reset")
}

#[tokio::test]
async fn test_driver_errors_pass_through_unchanged() {
    let driver = RecordingDriver::failing(connection_reset);
    let users = users(&driver);

    assert!(is_connection_reset(&users.count(&doc! { "username": "ann" }).await));
    assert!(is_connection_reset(&users.select(None, None).await));
    assert!(is_connection_reset(&users.select_one(None, None).await));
    assert!(is_connection_reset(&users.insert(&User::new("ann")).await));
    assert!(is_connection_reset(&users.delete(&doc! {}).await));
    assert!(is_connection_reset(&users.drop_collection(true).await));
}

#[tokio::test]
async fn test_failed_listing_never_drops() {
    let driver = RecordingDriver::failing(connection_reset);

    let result = users(&driver).drop_collection(true).await;

    assert!(is_connection_reset(&result));
    assert_eq!(driver.call_names(), vec!["list_collections".to_string()]);
}

#[tokio::test]
async fn test_null_primary_id_filter_matches_everything() {
    let driver = RecordingDriver::default();

    users(&driver).delete(&doc! { "id": Bson::Null }).await.unwrap();

    assert_eq!(driver.calls(), vec![("delete_many".to_string(), doc! {})]);
}

#[tokio::test]
async fn test_drop_without_confirmation_is_a_no_op() {
    let driver = RecordingDriver::with_collections(&["users"]);

    assert!(!users(&driver).drop_collection(false).await.unwrap());
    assert!(driver.calls().is_empty());
}

#[tokio::test]
async fn test_drop_refuses_ambiguous_collection() {
    let driver = RecordingDriver::with_collections(&["users", "users"]);

    let err = users(&driver).drop_collection(true).await.unwrap_err();

    assert!(matches!(err, DocumentStoreError::CollectionConflict { count: 2, .. }));
    assert!(err.is_fatal());
    assert_eq!(driver.call_names(), vec!["list_collections".to_string()]);
}

#[tokio::test]
async fn test_drop_missing_collection_returns_true() {
    let driver = RecordingDriver::with_collections(&["posts"]);

    assert!(users(&driver).drop_collection(true).await.unwrap());
    assert_eq!(driver.call_names(), vec!["list_collections".to_string()]);
}

#[tokio::test]
async fn test_drop_existing_collection() {
    let store = InMemoryStore::new();
    let users = users(&store);
    users.insert(&User::new("ann")).await.unwrap();

    assert!(users.drop_collection(true).await.unwrap());
    assert!(store.list_collections("users").await.unwrap().is_empty());
    assert!(users.drop_collection(true).await.unwrap());
}

#[tokio::test]
async fn test_pattern_id_fields_and_arrays() {
    let store = InMemoryStore::new();
    let posts: Repository<_, Document> = RepositoryBuilder::new(&store, "posts")
        .config(
            MappingConfig::from_json(
                r#"{
                    "fields_props": { "_id": "id", "auth": "author_ref" },
                    "id_fields": ["_id", { "pattern": "_refs?$" }]
                }"#,
            )
            .unwrap(),
        )
        .build()
        .unwrap();

    let author = ObjectId::new();
    let readers = vec![ObjectId::new(), ObjectId::new()];
    let reader_hex = readers.iter().map(|id| id.to_hex()).collect::<Vec<_>>();

    let id = posts
        .insert(&doc! {
            "id": Bson::Null,
            "author_ref": author.to_hex(),
            "reader_refs": reader_hex.clone(),
        })
        .await
        .unwrap();

    let stored = store
        .find_one("posts", doc! {}, FindOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.get_object_id("auth").unwrap(), author);
    assert_eq!(stored.get("reader_refs"), Some(&Bson::from(readers)));

    let post = posts
        .select_one(Some(&doc! { "author_ref": author.to_hex() }), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        post,
        doc! { "id": id, "author_ref": author.to_hex(), "reader_refs": reader_hex }
    );
}

#[tokio::test]
async fn test_concurrent_inserts_share_one_repository() {
    let users = Arc::new(users(Arc::new(InMemoryStore::new())));

    let handles = (0..8)
        .map(|n| {
            let users = users.clone();
            tokio::spawn(async move { users.insert(&User::new(&format!("user{n}"))).await })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(users.count(&doc! {}).await.unwrap(), 8);
}

#[test]
fn test_duplicate_rename_target_is_rejected() {
    let result = RepositoryBuilder::new(InMemoryStore::new(), "users")
        .rename("usr_name", "username")
        .rename("login", "username")
        .build::<User, User, Document>();

    assert!(matches!(result, Err(DocumentStoreError::InvalidConfiguration(_))));
}
