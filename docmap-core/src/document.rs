//! Conversions between application records and BSON documents.
//!
//! A repository is generic over the record types it accepts and returns. Anything that
//! implements `Serialize` can be written, anything that implements `Deserialize` can be read.
//! This module provides the two extension traits that bridge those records and the
//! [`bson::Document`] values the mapper and the drivers work on.

use bson::{Bson, Document, de::deserialize_from_document, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Extension trait for turning any serializable record into a document.
///
/// This trait is automatically implemented for every `Serialize` type, including
/// [`bson::Document`] itself.
///
/// # Example
///
/// ```ignore
/// use docmap::document::ToDocument;
///
/// #[derive(serde::Serialize)]
/// struct User { username: String }
///
/// let doc = User { username: "ann".into() }.to_document()?;
/// assert_eq!(doc.get_str("username")?, "ann");
/// ```
pub trait ToDocument {
    /// Serializes this value into a document.
    ///
    /// A value that serializes to `null` (for example `Option::None`) becomes an empty document
    /// so that downstream calls always receive a well-formed document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidDocument`] if the value serializes to something
    /// other than a document or `null`, or a serialization error if serialization fails.
    fn to_document(&self) -> DocumentStoreResult<Document>;
}

impl<T: Serialize + ?Sized> ToDocument for T {
    fn to_document(&self) -> DocumentStoreResult<Document> {
        match serialize_to_bson(self)? {
            Bson::Document(document) => Ok(document),
            Bson::Null => Ok(Document::new()),
            other => Err(DocumentStoreError::InvalidDocument(format!(
                "expected a document, got {:?}",
                other.element_type()
            ))),
        }
    }
}

/// Extension trait for building a record from an application-form document.
///
/// This trait is automatically implemented for every `DeserializeOwned` type.
pub trait FromDocument: Sized {
    /// Deserializes a record from a document.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the document does not fit the record's shape.
    fn from_document(document: Document) -> DocumentStoreResult<Self>;
}

impl<T: DeserializeOwned> FromDocument for T {
    fn from_document(document: Document) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_document(document)?)
    }
}
