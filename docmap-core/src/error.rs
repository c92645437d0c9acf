//! Error types and result types for data access operations.
//!
//! Every fallible operation in this crate returns [`DocumentStoreResult<T>`]. Driver failures are
//! carried through unchanged as [`DocumentStoreError::Backend`]; the mapping layer adds only
//! identifier and configuration errors of its own.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when reading or writing through a repository.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between records and documents.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during driver initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The mapping configuration is unusable (bad pattern, duplicate rename target, ...).
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// A value in an identifier field cannot be coerced into a store-native identifier.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    /// A document with the given identifier already exists in the collection.
    /// The first argument is the identifier, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// A value or result does not have the shape of a document.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// More than one collection answers to the configured collection name.
    ///
    /// This is a configuration inconsistency rather than a transient failure and must not be
    /// retried.
    #[error("Collection name {name} matches {count} collections")]
    CollectionConflict { name: String, count: usize },
    /// An error occurred in the underlying store driver.
    #[error("Backend error: {0}")]
    Backend(String),
    /// An unknown error occurred.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl DocumentStoreError {
    /// Returns `true` for errors that describe the caller's environment rather than a failed
    /// request. These should surface immediately and never be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DocumentStoreError::CollectionConflict { .. } | DocumentStoreError::InvalidConfiguration(_)
        )
    }
}

/// A specialized `Result` type for data access operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<regex::Error> for DocumentStoreError {
    fn from(err: regex::Error) -> Self {
        DocumentStoreError::InvalidConfiguration(err.to_string())
    }
}
