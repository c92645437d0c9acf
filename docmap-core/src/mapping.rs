//! Field-name remapping and identifier coercion between application and stored documents.
//!
//! A [`FieldMapper`] holds the two pieces of per-collection configuration the repository needs:
//!
//! - a [`RenameTable`] translating stored field names to application field names and back
//! - an [`IdFieldSet`] selecting which fields carry store-native identifiers
//!
//! All transforms are pure. They borrow their input and return a new document, so a single
//! mapper can be shared across concurrent calls without locking.
//!
//! # Example
//!
//! ```ignore
//! use bson::doc;
//! use docmap::mapping::{FieldMapper, IdFieldSet, RenameTable};
//!
//! let mapper = FieldMapper::new(
//!     RenameTable::from_pairs([("_id", "id"), ("usr_name", "username")])?,
//!     IdFieldSet::new().exact("_id"),
//! );
//!
//! let stored = mapper.to_stored(&doc! { "id": null, "username": "ann" });
//! assert_eq!(stored, doc! { "usr_name": "ann" });
//! ```

use std::collections::HashMap;

use bson::{Bson, Document, oid::ObjectId};
use regex::Regex;

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Name of the primary identifier field when none is configured.
pub const DEFAULT_PRIMARY_ID: &str = "_id";

/// Query operators whose value is a list of sub-filters.
const LOGICAL_OPERATORS: [&str; 3] = ["$and", "$or", "$nor"];

/// Query operators whose operand is compared against the field value.
const COMPARISON_OPERATORS: [&str; 8] = ["$eq", "$ne", "$gt", "$gte", "$lt", "$lte", "$in", "$nin"];

/// Bidirectional mapping between stored field names and application field names.
///
/// Names absent from the table map to themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameTable {
    to_application: HashMap<String, String>,
    to_stored: HashMap<String, String>,
}

impl RenameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from `(stored, application)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidConfiguration`] if two stored names map to the same
    /// application name.
    pub fn from_pairs<S, A>(pairs: impl IntoIterator<Item = (S, A)>) -> DocumentStoreResult<Self>
    where
        S: Into<String>,
        A: Into<String>,
    {
        let mut table = Self::new();

        for (stored, application) in pairs {
            table.insert(stored, application)?;
        }

        Ok(table)
    }

    /// Adds a `stored -> application` entry, replacing any previous entry for `stored`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidConfiguration`] if `application` is already the
    /// target of a different stored name.
    pub fn insert(
        &mut self,
        stored: impl Into<String>,
        application: impl Into<String>,
    ) -> DocumentStoreResult<()> {
        let stored = stored.into();
        let application = application.into();

        if let Some(existing) = self.to_stored.get(&application) {
            if existing != &stored {
                return Err(DocumentStoreError::InvalidConfiguration(format!(
                    "fields {existing} and {stored} both map to {application}"
                )));
            }
        }

        if let Some(previous) = self.to_application.insert(stored.clone(), application.clone()) {
            self.to_stored.remove(&previous);
        }
        self.to_stored.insert(application, stored);

        Ok(())
    }

    /// Returns the stored name for an application field name.
    pub fn stored_name<'a>(&'a self, application: &'a str) -> &'a str {
        self.to_stored
            .get(application)
            .map(String::as_str)
            .unwrap_or(application)
    }

    /// Returns the application name for a stored field name.
    pub fn application_name<'a>(&'a self, stored: &'a str) -> &'a str {
        self.to_application
            .get(stored)
            .map(String::as_str)
            .unwrap_or(stored)
    }

    pub fn len(&self) -> usize {
        self.to_application.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_application.is_empty()
    }
}

/// A single rule selecting identifier fields by name.
#[derive(Debug, Clone)]
pub enum IdFieldSelector {
    /// Matches a field whose name is exactly this string.
    Exact(String),
    /// Matches a field whose name contains a match of this pattern. Anchor the pattern with
    /// `^...$` to require a full match.
    Pattern(Regex),
}

impl IdFieldSelector {
    pub fn matches(&self, field: &str) -> bool {
        match self {
            IdFieldSelector::Exact(name) => name == field,
            IdFieldSelector::Pattern(pattern) => pattern.is_match(field),
        }
    }
}

/// Ordered set of identifier field selectors.
///
/// Selectors are tested in the order they were added and the first match wins.
#[derive(Debug, Clone, Default)]
pub struct IdFieldSet {
    selectors: Vec<IdFieldSelector>,
}

impl IdFieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an exact-name selector.
    pub fn exact(mut self, name: impl Into<String>) -> Self {
        self.selectors.push(IdFieldSelector::Exact(name.into()));
        self
    }

    /// Adds a pattern selector.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidConfiguration`] if the pattern does not compile.
    pub fn pattern(mut self, pattern: &str) -> DocumentStoreResult<Self> {
        self.selectors.push(IdFieldSelector::Pattern(Regex::new(pattern)?));
        Ok(self)
    }

    pub fn push(&mut self, selector: IdFieldSelector) {
        self.selectors.push(selector);
    }

    /// Returns the first selector matching `field`, if any.
    pub fn matching(&self, field: &str) -> Option<&IdFieldSelector> {
        self.selectors
            .iter()
            .find(|selector| selector.matches(field))
    }

    pub fn matches(&self, field: &str) -> bool {
        self.matching(field).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IdFieldSelector> {
        self.selectors.iter()
    }
}

/// Translates documents between application form and stored form for one collection.
#[derive(Debug, Clone)]
pub struct FieldMapper {
    renames: RenameTable,
    id_fields: IdFieldSet,
    primary_id: String,
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::new(RenameTable::new(), IdFieldSet::new())
    }
}

impl FieldMapper {
    /// Creates a mapper whose primary identifier is [`DEFAULT_PRIMARY_ID`].
    pub fn new(renames: RenameTable, id_fields: IdFieldSet) -> Self {
        Self {
            renames,
            id_fields,
            primary_id: DEFAULT_PRIMARY_ID.to_string(),
        }
    }

    /// Sets the stored name of the primary identifier field.
    pub fn with_primary_id(mut self, primary_id: impl Into<String>) -> Self {
        self.primary_id = primary_id.into();
        self
    }

    pub fn renames(&self) -> &RenameTable {
        &self.renames
    }

    pub fn id_fields(&self) -> &IdFieldSet {
        &self.id_fields
    }

    pub fn primary_id(&self) -> &str {
        &self.primary_id
    }

    /// Maps an application-form document to stored field names.
    ///
    /// A primary identifier holding `null` is dropped from the result so the store can assign
    /// one. Sub-filters under `$and`, `$or` and `$nor` are mapped as well.
    pub fn to_stored(&self, document: &Document) -> Document {
        let mut stored = self.rename_keys(document, &|key| self.renames.stored_name(key).to_string());

        if matches!(stored.get(&self.primary_id), Some(Bson::Null)) {
            stored.remove(&self.primary_id);
        }

        stored
    }

    /// Maps a stored document to application field names.
    pub fn to_application(&self, document: &Document) -> Document {
        self.rename_keys(document, &|key| self.renames.application_name(key).to_string())
    }

    /// Converts the values of identifier fields between strings and native identifiers.
    ///
    /// The direction is decided per value: native identifiers become their hex string, anything
    /// else is parsed into a native identifier. Arrays are converted element by element, and
    /// the operands of comparison operators (`{ "$in": [...] }`) are converted in place.
    ///
    /// A field is an identifier field when either its own name or its stored name matches the
    /// selector set, so this works on documents in both forms.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidIdentifier`] when a value cannot be parsed.
    pub fn coerce_identifiers(&self, document: &Document) -> DocumentStoreResult<Document> {
        document
            .iter()
            .map(|(key, value)| {
                let value = if LOGICAL_OPERATORS.contains(&key.as_str()) {
                    self.coerce_sub_filters(value)?
                } else if self.is_identifier_field(key) {
                    coerce_value(key, value)?
                } else {
                    value.clone()
                };

                Ok((key.clone(), value))
            })
            .collect()
    }

    /// Returns `true` if `field` (in either form) holds identifiers.
    pub fn is_identifier_field(&self, field: &str) -> bool {
        self.id_fields.matches(field)
            || self.id_fields.matches(self.renames.stored_name(field))
            || self.id_fields.matches(self.renames.application_name(field))
    }

    fn rename_keys(&self, document: &Document, rename: &dyn Fn(&str) -> String) -> Document {
        document
            .iter()
            .map(|(key, value)| {
                if LOGICAL_OPERATORS.contains(&key.as_str()) {
                    (key.clone(), self.rename_sub_filters(value, rename))
                } else {
                    (rename(key), value.clone())
                }
            })
            .collect()
    }

    fn rename_sub_filters(&self, value: &Bson, rename: &dyn Fn(&str) -> String) -> Bson {
        match value {
            Bson::Array(filters) => Bson::Array(
                filters
                    .iter()
                    .map(|filter| match filter {
                        Bson::Document(document) => Bson::Document(self.rename_keys(document, rename)),
                        other => other.clone(),
                    })
                    .collect()
            ),
            other => other.clone(),
        }
    }

    fn coerce_sub_filters(&self, value: &Bson) -> DocumentStoreResult<Bson> {
        match value {
            Bson::Array(filters) => Ok(Bson::Array(
                filters
                    .iter()
                    .map(|filter| match filter {
                        Bson::Document(document) => self.coerce_identifiers(document).map(Bson::Document),
                        other => Ok(other.clone()),
                    })
                    .collect::<DocumentStoreResult<Vec<_>>>()?
            )),
            other => Ok(other.clone()),
        }
    }
}

/// Parses an identifier string into a native [`ObjectId`].
///
/// # Errors
///
/// Returns [`DocumentStoreError::InvalidIdentifier`] if `value` is not 24 hexadecimal digits.
pub fn parse_identifier(value: &str) -> DocumentStoreResult<ObjectId> {
    ObjectId::parse_str(value)
        .map_err(|e| DocumentStoreError::InvalidIdentifier(format!("{value}: {e}")))
}

/// Renders an identifier assigned by a driver as a string.
///
/// # Errors
///
/// Returns [`DocumentStoreError::InvalidIdentifier`] for values that have no string form.
pub fn identifier_to_string(value: &Bson) -> DocumentStoreResult<String> {
    match value {
        Bson::ObjectId(oid) => Ok(oid.to_hex()),
        Bson::String(s) => Ok(s.clone()),
        Bson::Int32(n) => Ok(n.to_string()),
        Bson::Int64(n) => Ok(n.to_string()),
        other => Err(DocumentStoreError::InvalidIdentifier(format!(
            "unsupported identifier type {:?}",
            other.element_type()
        ))),
    }
}

fn is_operator_document(document: &Document) -> bool {
    !document.is_empty() && document.keys().all(|key| key.starts_with('$'))
}

fn coerce_value(field: &str, value: &Bson) -> DocumentStoreResult<Bson> {
    match value {
        Bson::Array(items) => Ok(Bson::Array(
            items
                .iter()
                .map(|item| coerce_scalar(field, item))
                .collect::<DocumentStoreResult<Vec<_>>>()?
        )),
        Bson::Document(operators) if is_operator_document(operators) => Ok(Bson::Document(
            operators
                .iter()
                .map(|(op, operand)| {
                    if COMPARISON_OPERATORS.contains(&op.as_str()) {
                        Ok((op.clone(), coerce_value(field, operand)?))
                    } else {
                        Ok((op.clone(), operand.clone()))
                    }
                })
                .collect::<DocumentStoreResult<Document>>()?
        )),
        other => coerce_scalar(field, other),
    }
}

fn coerce_scalar(field: &str, value: &Bson) -> DocumentStoreResult<Bson> {
    match value {
        Bson::ObjectId(oid) => Ok(Bson::String(oid.to_hex())),
        Bson::String(s) => parse_identifier(s).map(Bson::ObjectId),
        // An unset reference, not an identifier.
        Bson::Null => Ok(Bson::Null),
        other => Err(DocumentStoreError::InvalidIdentifier(format!(
            "field {field} holds {:?}, expected an identifier",
            other.element_type()
        ))),
    }
}
