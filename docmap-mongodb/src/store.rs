use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Bson, Document, doc};
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, FindOneOptions, FindOptions as MongoFindOptions},
};
use tracing::instrument;
use docmap_core::{
    driver::{CollectionDescriptor, StoreDriver, StoreDriverBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    options::FindOptions,
};

const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    fn find_options(options: &FindOptions) -> MongoFindOptions {
        let mut mongo = MongoFindOptions::default();

        mongo.limit = options.limit.map(|limit| i64::try_from(limit).unwrap_or(i64::MAX));
        mongo.skip = options.skip.map(|skip| u64::try_from(skip).unwrap_or(u64::MAX));
        mongo.sort = options.sort_document();
        mongo.projection = options.projection.clone();

        mongo
    }

    fn find_one_options(options: &FindOptions) -> FindOneOptions {
        let mut mongo = FindOneOptions::default();

        mongo.skip = options.skip.map(|skip| u64::try_from(skip).unwrap_or(u64::MAX));
        mongo.sort = options.sort_document();
        mongo.projection = options.projection.clone();

        mongo
    }

    fn insert_error(err: MongoError, collection: &str, document: &Document) -> DocumentStoreError {
        match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY => {
                DocumentStoreError::DocumentAlreadyExists(
                    document
                        .get("_id")
                        .map(|id| id.to_string())
                        .unwrap_or_default(),
                    collection.to_string(),
                )
            }
            _ => DocumentStoreError::Backend(err.to_string()),
        }
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

#[async_trait]
impl StoreDriver for MongoDbStore {
    #[instrument(level = "debug", skip(self, filter))]
    async fn count(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        self.get_collection(collection)
            .count_documents(filter)
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))
    }

    #[instrument(level = "debug", skip(self, filter))]
    async fn delete_many(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        Ok(
            self.get_collection(collection)
                .delete_many(filter)
                .await
                .map_err(|e| DocumentStoreError::Backend(e.to_string()))?
                .deleted_count
        )
    }

    #[instrument(level = "debug", skip(self, document))]
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<Bson> {
        Ok(
            self.get_collection(collection)
                .insert_one(&document)
                .await
                .map_err(|e| Self::insert_error(e, collection, &document))?
                .inserted_id
        )
    }

    #[instrument(level = "debug", skip(self, filter, options))]
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Document>> {
        self.get_collection(collection)
            .find(filter)
            .with_options(Self::find_options(&options))
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))
    }

    #[instrument(level = "debug", skip(self, filter, options))]
    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Option<Document>> {
        self.get_collection(collection)
            .find_one(filter)
            .with_options(Self::find_one_options(&options))
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))
    }

    #[instrument(level = "debug", skip(self, filter, update))]
    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> DocumentStoreResult<u64> {
        Ok(
            self.get_collection(collection)
                .update_many(filter, update)
                .await
                .map_err(|e| DocumentStoreError::Backend(e.to_string()))?
                .modified_count
        )
    }

    #[instrument(level = "debug", skip(self))]
    async fn list_collections(&self, name: &str) -> DocumentStoreResult<Vec<CollectionDescriptor>> {
        Ok(
            self.client
                .database(&self.database)
                .list_collections()
                .filter(doc! { "name": name })
                .await
                .map_err(|e| DocumentStoreError::Backend(e.to_string()))?
                .try_collect::<Vec<_>>()
                .await
                .map_err(|e| DocumentStoreError::Backend(e.to_string()))?
                .into_iter()
                .map(|spec| CollectionDescriptor::new(spec.name))
                .collect()
        )
    }

    #[instrument(level = "debug", skip(self))]
    async fn drop_collection(&self, collection: &str) -> DocumentStoreResult<()> {
        self.get_collection(collection)
            .drop()
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.shutdown().await
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreDriverBuilder for MongoDbStoreBuilder {
    type Driver = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Driver> {
        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            )
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}

#[cfg(test)]
mod tests {
    use docmap_core::options::SortDirection;

    use super::*;

    #[test]
    fn test_find_options_translation() {
        let options = FindOptions::builder()
            .sort("usr_name", SortDirection::Desc)
            .skip(5)
            .limit(10)
            .projection(doc! { "usr_name": 1 })
            .build();

        let mongo = MongoDbStore::find_options(&options);

        assert_eq!(mongo.limit, Some(10));
        assert_eq!(mongo.skip, Some(5));
        assert_eq!(mongo.sort, Some(doc! { "usr_name": -1 }));
        assert_eq!(mongo.projection, Some(doc! { "usr_name": 1 }));
    }

    #[test]
    fn test_oversized_limit_saturates() {
        let options = FindOptions::builder()
            .limit(usize::MAX)
            .skip(usize::MAX)
            .build();

        let mongo = MongoDbStore::find_options(&options);

        assert_eq!(mongo.limit, Some(i64::MAX));
        assert!(mongo.skip.is_some_and(|skip| skip > 0));
    }

    #[test]
    fn test_default_options_leave_driver_defaults() {
        let mongo = MongoDbStore::find_one_options(&FindOptions::default());

        assert!(mongo.skip.is_none());
        assert!(mongo.sort.is_none());
        assert!(mongo.projection.is_none());
    }
}
