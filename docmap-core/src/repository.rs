//! Typed data access over a single collection.
//!
//! A [`Repository`] is the uniform CRUD entry point. Every inbound filter and value passes
//! through the collection's [`FieldMapper`] before it reaches the [`StoreDriver`], and every
//! outbound document passes back through it before it is handed to the caller. Callers only
//! ever see application-form records.
//!
//! # Example
//!
//! ```ignore
//! use bson::doc;
//! use docmap::{memory::InMemoryStore, repository::{Repository, RepositoryBuilder}};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     pub id: Option<String>,
//!     pub username: String,
//! }
//!
//! let store = InMemoryStore::new();
//! let users: Repository<_, User> = RepositoryBuilder::new(&store, "users")
//!     .rename("_id", "id")
//!     .rename("usr_name", "username")
//!     .id_field("_id")
//!     .build()?;
//!
//! let id = users.insert(&User { id: None, username: "ann".into() }).await?;
//! let ann = users.select_one(Some(&doc! { "id": id.as_str() }), None).await?;
//! ```

use std::marker::PhantomData;

use bson::Document;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::{
    config::{IdFieldSpec, MappingConfig},
    document::{FromDocument, ToDocument},
    driver::StoreDriver,
    error::{DocumentStoreError, DocumentStoreResult},
    mapping::{FieldMapper, identifier_to_string},
    options::FindOptions,
};

/// Data access facade for one collection.
///
/// # Type Parameters
///
/// * `B` - The store driver (often `&Driver` or `Arc<Driver>` so several repositories share it)
/// * `V` - Values accepted by [`insert`](Self::insert)
/// * `R` - Records returned by [`select`](Self::select) and [`select_one`](Self::select_one)
/// * `F` - Filters, in application form
///
/// The repository holds no mutable state and can be shared across tasks.
#[derive(Debug)]
pub struct Repository<B, V, R = V, F = Document> {
    driver: B,
    collection: String,
    mapper: FieldMapper,
    _marker: PhantomData<fn(V, F) -> R>,
}

impl<B, V, R, F> Repository<B, V, R, F>
where
    B: StoreDriver,
    V: Serialize + Sync,
    R: DeserializeOwned,
    F: Serialize + Sync,
{
    /// Creates a repository over `collection` using an already built mapper.
    pub fn new(driver: B, collection: impl Into<String>, mapper: FieldMapper) -> Self {
        Self {
            driver,
            collection: collection.into(),
            mapper,
            _marker: PhantomData,
        }
    }

    /// Returns the name of the collection this repository reads and writes.
    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    pub fn mapper(&self) -> &FieldMapper {
        &self.mapper
    }

    pub fn driver(&self) -> &B {
        &self.driver
    }

    /// Counts the records matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter holds a malformed identifier or the driver fails.
    pub async fn count(&self, filter: &F) -> DocumentStoreResult<u64> {
        let filter = self.map_filter(Some(filter))?;
        let count = self.driver
            .count(&self.collection, filter)
            .await?;

        debug!(collection = %self.collection, count, "counted records");

        Ok(count)
    }

    /// Deletes every record matching `filter` and returns how many were removed.
    ///
    /// A `null` primary identifier is dropped from the filter like it is from inserted values,
    /// so `{ id: null }` becomes the empty filter and deletes the whole collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter holds a malformed identifier or the driver fails.
    pub async fn delete(&self, filter: &F) -> DocumentStoreResult<u64> {
        let filter = self.map_filter(Some(filter))?;
        let deleted = self.driver
            .delete_many(&self.collection, filter)
            .await?;

        debug!(collection = %self.collection, deleted, "deleted records");

        Ok(deleted)
    }

    /// Inserts a record and returns its identifier as a string.
    ///
    /// A `null` primary identifier is left out of the stored document so the store assigns
    /// one.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a document, holds a malformed identifier, or the
    /// driver fails.
    pub async fn insert(&self, value: &V) -> DocumentStoreResult<String> {
        let document = self.mapper.coerce_identifiers(
            &self.mapper.to_stored(&value.to_document()?)
        )?;
        let id = identifier_to_string(
            &self.driver
                .insert_one(&self.collection, document)
                .await?
        )?;

        debug!(collection = %self.collection, id = %id, "inserted record");

        Ok(id)
    }

    /// Returns every record matching `filter`.
    ///
    /// `options` is handed to the driver untouched; ordering is whatever the driver and the
    /// options produce.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter holds a malformed identifier, a result does not fit `R`,
    /// or the driver fails.
    pub async fn select(
        &self,
        filter: Option<&F>,
        options: Option<FindOptions>,
    ) -> DocumentStoreResult<Vec<R>> {
        let filter = self.map_filter(filter)?;
        let records = self.driver
            .find(&self.collection, filter, options.unwrap_or_default())
            .await?
            .into_iter()
            .map(|document| self.map_result(document))
            .collect::<DocumentStoreResult<Vec<R>>>()?;

        debug!(collection = %self.collection, returned = records.len(), "selected records");

        Ok(records)
    }

    /// Returns the first record matching `filter`, or `None` when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter holds a malformed identifier, the result does not fit
    /// `R`, or the driver fails.
    pub async fn select_one(
        &self,
        filter: Option<&F>,
        options: Option<FindOptions>,
    ) -> DocumentStoreResult<Option<R>> {
        let filter = self.map_filter(filter)?;
        let record = self.driver
            .find_one(&self.collection, filter, options.unwrap_or_default())
            .await?
            .map(|document| self.map_result(document))
            .transpose()?;

        debug!(collection = %self.collection, found = record.is_some(), "selected one record");

        Ok(record)
    }

    /// Applies `values` to every record matching `filter` and returns how many changed.
    ///
    /// Only the filter is mapped. `values` is an update-operator document in the driver's
    /// syntax (`{ "$set": { ... } }`) and reaches the driver as-is, so it must already use
    /// stored field names and native identifiers.
    ///
    /// As with [`delete`](Self::delete), a `null` primary identifier in `filter` is dropped and
    /// the update then applies to every record.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter holds a malformed identifier or the driver fails.
    pub async fn update<U>(&self, filter: &F, values: &U) -> DocumentStoreResult<u64>
    where
        U: Serialize + Sync + ?Sized,
    {
        let filter = self.map_filter(Some(filter))?;
        let modified = self.driver
            .update_many(&self.collection, filter, values.to_document()?)
            .await?;

        debug!(collection = %self.collection, modified, "updated records");

        Ok(modified)
    }

    /// Drops the collection when `confirm` is `true`.
    ///
    /// Without confirmation this returns `false` and does not touch the driver. With
    /// confirmation it returns `true` whether the collection was dropped or was already absent.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::CollectionConflict`] without dropping anything if more than
    /// one collection carries the configured name, or the driver's error if listing or dropping
    /// fails.
    pub async fn drop_collection(&self, confirm: bool) -> DocumentStoreResult<bool> {
        if !confirm {
            return Ok(false);
        }

        let matches = self.driver
            .list_collections(&self.collection)
            .await?
            .into_iter()
            .filter(|descriptor| descriptor.name == self.collection)
            .count();

        match matches {
            0 => {
                debug!(collection = %self.collection, "collection already absent");
            }
            1 => {
                self.driver
                    .drop_collection(&self.collection)
                    .await?;

                debug!(collection = %self.collection, "dropped collection");
            }
            count => {
                warn!(collection = %self.collection, count, "refusing to drop ambiguous collection name");

                return Err(DocumentStoreError::CollectionConflict {
                    name: self.collection.clone(),
                    count,
                });
            }
        }

        Ok(true)
    }

    /// Shuts down the underlying driver.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to shut down.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.driver.shutdown().await
    }

    fn map_filter(&self, filter: Option<&F>) -> DocumentStoreResult<Document> {
        let filter = match filter {
            Some(filter) => filter.to_document()?,
            None => Document::new(),
        };

        self.mapper.coerce_identifiers(&self.mapper.to_stored(&filter))
    }

    fn map_result(&self, document: Document) -> DocumentStoreResult<R> {
        R::from_document(
            self.mapper.coerce_identifiers(&self.mapper.to_application(&document))?
        )
    }
}

/// Builder for [`Repository`] instances.
///
/// The builder collects a [`MappingConfig`] and compiles it on [`build`](Self::build).
///
/// # Example
///
/// ```ignore
/// let users: Repository<_, User> = RepositoryBuilder::new(&store, "users")
///     .rename("_id", "id")
///     .id_field("_id")
///     .id_pattern("_ref$")
///     .build()?;
/// ```
#[derive(Debug)]
pub struct RepositoryBuilder<B> {
    driver: B,
    collection: String,
    config: MappingConfig,
}

impl<B: StoreDriver> RepositoryBuilder<B> {
    pub fn new(driver: B, collection: impl Into<String>) -> Self {
        Self {
            driver,
            collection: collection.into(),
            config: MappingConfig::default(),
        }
    }

    /// Replaces the whole mapping configuration.
    pub fn config(mut self, config: MappingConfig) -> Self {
        self.config = config;
        self
    }

    /// Maps the stored field `stored` to the application field `application`.
    pub fn rename(mut self, stored: impl Into<String>, application: impl Into<String>) -> Self {
        self.config
            .fields_props
            .insert(stored.into(), application.into());
        self
    }

    /// Marks a field, by exact name, as holding identifiers.
    pub fn id_field(mut self, name: impl Into<String>) -> Self {
        self.config
            .id_fields
            .push(IdFieldSpec::Exact(name.into()));
        self
    }

    /// Marks every field whose name matches `pattern` as holding identifiers.
    ///
    /// The pattern is compiled by [`build`](Self::build).
    pub fn id_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config
            .id_fields
            .push(IdFieldSpec::Pattern { pattern: pattern.into() });
        self
    }

    /// Sets the stored name of the primary identifier field (`_id` by default).
    pub fn primary_id(mut self, name: impl Into<String>) -> Self {
        self.config.primary_id = name.into();
        self
    }

    /// Compiles the mapping configuration and creates the repository.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidConfiguration`] if a pattern does not compile or two
    /// stored fields share an application name.
    pub fn build<V, R, F>(self) -> DocumentStoreResult<Repository<B, V, R, F>>
    where
        V: Serialize + Sync,
        R: DeserializeOwned,
        F: Serialize + Sync,
    {
        Ok(Repository::new(
            self.driver,
            self.collection,
            self.config.build_mapper()?,
        ))
    }
}
