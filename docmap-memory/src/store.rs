//! In-memory storage implementation of the store driver.
//!
//! Documents are kept per collection in insertion order behind an async-aware read-write lock.

use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use mea::rwlock::RwLock;

use docmap_core::{
    driver::{CollectionDescriptor, StoreDriver, StoreDriverBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    options::{FindOptions, SortDirection},
};

use crate::evaluator::{DocumentEvaluator, Comparable, apply_update, compare_at, project};

type CollectionList = Vec<Document>;
type StoreMap = HashMap<String, CollectionList>;

const PRIMARY_ID: &str = "_id";


/// Thread-safe in-memory document store driver.
///
/// This struct implements [`StoreDriver`] entirely in memory. Documents keep their insertion
/// order, which is the natural order returned by unsorted finds. Inserting a document without
/// an `_id` assigns a fresh [`ObjectId`], mirroring what a real document database does.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing it to be
/// safely shared across async tasks. Multiple clones of the same instance share the same
/// underlying data.
///
/// # Performance
///
/// Every operation scans the whole collection. This is intended for development and tests.
///
/// # Example
///
/// ```ignore
/// use docmap_memory::InMemoryStore;
/// use docmap::driver::StoreDriver;
/// use bson::doc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = InMemoryStore::new();
///
///     let id = store.insert_one("users", doc! { "usr_name": "ann" }).await?;
///     assert_eq!(store.count("users", doc! { "_id": id }).await?, 1);
///
///     Ok(())
/// }
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection_name -> documents in insertion order
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    async fn matching(&self, collection: &str, filter: &Document) -> DocumentStoreResult<Vec<Document>> {
        let store = self.store.read().await;

        match store.get(collection) {
            Some(documents) => DocumentEvaluator::filter_documents(documents.iter(), filter),
            None => Ok(vec![]),
        }
    }
}


#[async_trait]
impl StoreDriver for InMemoryStore {
    async fn count(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        Ok(self.matching(collection, &filter).await?.len() as u64)
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        let mut store = self.store.write().await;
        let documents = match store.get_mut(collection) {
            Some(documents) => documents,
            None => return Ok(0),
        };

        // Evaluate everything first so a bad filter deletes nothing
        let doomed = documents
            .iter()
            .map(|document| DocumentEvaluator::new(document).matches(&filter))
            .collect::<DocumentStoreResult<Vec<bool>>>()?;
        let deleted = doomed.iter().filter(|d| **d).count() as u64;

        let mut doomed = doomed.into_iter();
        documents.retain(|_| !doomed.next().unwrap_or(false));

        Ok(deleted)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<Bson> {
        let mut store = self.store.write().await;
        let documents = store
            .entry(collection.to_string())
            .or_default();

        let (id, document) = match document.get(PRIMARY_ID).cloned() {
            Some(id) => (id, document),
            None => {
                let id = Bson::ObjectId(ObjectId::new());
                let mut assigned = Document::new();
                assigned.insert(PRIMARY_ID, id.clone());
                for (field, value) in document {
                    assigned.insert(field, value);
                }
                (id, assigned)
            }
        };

        let exists = documents.iter().any(|existing| {
            existing
                .get(PRIMARY_ID)
                .map(Comparable::from)
                == Some(Comparable::from(&id))
        });

        if exists {
            return Err(DocumentStoreError::DocumentAlreadyExists(id.to_string(), collection.to_string()));
        }

        documents.push(document);

        Ok(id)
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Document>> {
        let mut documents = self.matching(collection, &filter).await?;

        // Stable sort, so ties keep insertion order
        if !options.sort.is_empty() {
            documents.sort_by(|a, b| {
                options.sort
                    .iter()
                    .map(|sort| {
                        let ordering = compare_at(a, b, &sort.field);
                        match sort.direction {
                            SortDirection::Asc => ordering,
                            SortDirection::Desc => ordering.reverse(),
                        }
                    })
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(Ordering::Equal)
            });
        }

        Ok(
            documents
                .into_iter()
                .skip(options.skip.unwrap_or(0))
                .take(options.limit.unwrap_or(usize::MAX))
                .map(|document| match &options.projection {
                    Some(projection) => project(document, projection),
                    None => document,
                })
                .collect()
        )
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Option<Document>> {
        Ok(
            self.find(collection, filter, FindOptions { limit: Some(1), ..options })
                .await?
                .into_iter()
                .next()
        )
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> DocumentStoreResult<u64> {
        let mut store = self.store.write().await;
        let documents = match store.get_mut(collection) {
            Some(documents) => documents,
            None => return Ok(0),
        };

        let mut modified = 0;

        for document in documents.iter_mut() {
            if !DocumentEvaluator::new(document).matches(&filter)? {
                continue;
            }

            // Work on a copy so a failing operator leaves the stored document untouched
            let mut updated = document.clone();
            if apply_update(&mut updated, &update)? {
                *document = updated;
                modified += 1;
            }
        }

        Ok(modified)
    }

    async fn list_collections(&self, name: &str) -> DocumentStoreResult<Vec<CollectionDescriptor>> {
        Ok(
            self.store
                .read()
                .await
                .keys()
                .filter(|collection| collection.as_str() == name)
                .map(CollectionDescriptor::new)
                .collect()
        )
    }

    async fn drop_collection(&self, collection: &str) -> DocumentStoreResult<()> {
        // Dropping a missing collection is a no-op, as in document databases
        self.store
            .write()
            .await
            .remove(collection);

        Ok(())
    }
}


/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use docmap_memory::InMemoryStore;
/// use docmap::driver::StoreDriverBuilder;
///
/// #[tokio::main]
/// async fn main() {
///     let store = InMemoryStore::builder().build().await.unwrap();
/// }
/// ```
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreDriverBuilder for InMemoryStoreBuilder {
    type Driver = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance.
    ///
    /// This always succeeds and returns a freshly initialized store.
    async fn build(self) -> DocumentStoreResult<Self::Driver> {
        Ok(InMemoryStore::new())
    }
}
