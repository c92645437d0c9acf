//! Store driver abstraction.
//!
//! The repository never talks to a database directly. It calls a [`StoreDriver`], a narrow
//! request/response contract over stored-form documents, and leaves connection management,
//! pooling, and retries to the driver.
//!
//! # Traits
//!
//! - [`StoreDriver`]: The contract a store must fulfil
//! - [`StoreDriverBuilder`]: Factory trait for creating driver instances
//!
//! # Examples
//!
//! ```ignore
//! use docmap::driver::StoreDriver;
//! use bson::doc;
//!
//! let driver = MyDriver::new();
//! let id = driver.insert_one("users", doc! { "usr_name": "ann" }).await?;
//! let found = driver.find_one("users", doc! { "_id": id }, FindOptions::default()).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use bson::{Bson, Document};

use crate::{error::DocumentStoreResult, options::FindOptions};

/// Description of a collection returned by [`StoreDriver::list_collections`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionDescriptor {
    pub name: String,
}

impl CollectionDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Abstract interface for document store drivers.
///
/// Every method takes and returns documents in stored form. Drivers report failures as
/// [`DocumentStoreError::Backend`](crate::error::DocumentStoreError::Backend) (or a more
/// specific variant) and the repository passes them on untouched.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; a single driver is typically shared by many
/// repositories through a reference or an [`Arc`].
#[async_trait]
pub trait StoreDriver: Send + Sync + Debug {
    /// Counts the documents matching `filter`.
    async fn count(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64>;

    /// Deletes every document matching `filter` and returns how many were removed.
    async fn delete_many(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64>;

    /// Inserts a document and returns its primary identifier.
    ///
    /// When the document carries no primary identifier the driver assigns one.
    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<Bson>;

    /// Returns every document matching `filter`, shaped by `options`.
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Document>>;

    /// Returns the first document matching `filter`, or `None`.
    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Option<Document>>;

    /// Applies `update` to every document matching `filter` and returns how many changed.
    ///
    /// `update` is an update-operator document (`{ "$set": { ... } }`) in the driver's syntax.
    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> DocumentStoreResult<u64>;

    /// Lists the collections whose name equals `name`.
    async fn list_collections(&self, name: &str) -> DocumentStoreResult<Vec<CollectionDescriptor>>;

    /// Drops a collection and all its documents.
    ///
    /// # Warning
    ///
    /// This operation is irreversible.
    async fn drop_collection(&self, collection: &str) -> DocumentStoreResult<()>;

    /// Cleanly shuts down the driver, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<D> StoreDriver for &D
where
    D: StoreDriver + ?Sized,
{
    async fn count(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        (**self).count(collection, filter).await
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        (**self).delete_many(collection, filter).await
    }

    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<Bson> {
        (**self).insert_one(collection, document).await
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Document>> {
        (**self)
            .find(collection, filter, options)
            .await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Option<Document>> {
        (**self)
            .find_one(collection, filter, options)
            .await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> DocumentStoreResult<u64> {
        (**self)
            .update_many(collection, filter, update)
            .await
    }

    async fn list_collections(&self, name: &str) -> DocumentStoreResult<Vec<CollectionDescriptor>> {
        (**self).list_collections(name).await
    }

    async fn drop_collection(&self, collection: &str) -> DocumentStoreResult<()> {
        (**self).drop_collection(collection).await
    }
}

#[async_trait]
impl<D> StoreDriver for Arc<D>
where
    D: StoreDriver + ?Sized,
{
    async fn count(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        (**self).count(collection, filter).await
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> DocumentStoreResult<u64> {
        (**self).delete_many(collection, filter).await
    }

    async fn insert_one(&self, collection: &str, document: Document) -> DocumentStoreResult<Bson> {
        (**self).insert_one(collection, document).await
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Vec<Document>> {
        (**self)
            .find(collection, filter, options)
            .await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DocumentStoreResult<Option<Document>> {
        (**self)
            .find_one(collection, filter, options)
            .await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> DocumentStoreResult<u64> {
        (**self)
            .update_many(collection, filter, update)
            .await
    }

    async fn list_collections(&self, name: &str) -> DocumentStoreResult<Vec<CollectionDescriptor>> {
        (**self).list_collections(name).await
    }

    async fn drop_collection(&self, collection: &str) -> DocumentStoreResult<()> {
        (**self).drop_collection(collection).await
    }
}

#[async_trait]
pub trait StoreDriverBuilder {
    type Driver: StoreDriver;

    async fn build(self) -> DocumentStoreResult<Self::Driver>;
}
