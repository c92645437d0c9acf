//! Serializable mapping configuration.
//!
//! [`MappingConfig`] is the declarative form of a [`FieldMapper`]. It can be written by hand,
//! embedded in a larger application config, or loaded from JSON:
//!
//! ```json
//! {
//!     "fields_props": { "_id": "id", "usr_name": "username" },
//!     "id_fields": ["_id", { "pattern": "_ref$" }]
//! }
//! ```

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    error::DocumentStoreResult,
    mapping::{DEFAULT_PRIMARY_ID, FieldMapper, IdFieldSelector, IdFieldSet, RenameTable},
};

/// One entry of the identifier field list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdFieldSpec {
    /// An exact field name.
    Exact(String),
    /// A regular expression tested against field names.
    Pattern { pattern: String },
}

impl IdFieldSpec {
    fn compile(&self) -> DocumentStoreResult<IdFieldSelector> {
        Ok(match self {
            IdFieldSpec::Exact(name) => IdFieldSelector::Exact(name.clone()),
            IdFieldSpec::Pattern { pattern } => IdFieldSelector::Pattern(Regex::new(pattern)?),
        })
    }
}

/// Declarative mapping configuration for one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Stored field name -> application field name.
    #[serde(default)]
    pub fields_props: BTreeMap<String, String>,
    /// Fields holding store-native identifiers, tested in order.
    #[serde(default)]
    pub id_fields: Vec<IdFieldSpec>,
    /// Stored name of the primary identifier field.
    #[serde(default = "default_primary_id")]
    pub primary_id: String,
}

fn default_primary_id() -> String {
    DEFAULT_PRIMARY_ID.to_string()
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            fields_props: BTreeMap::new(),
            id_fields: Vec::new(),
            primary_id: default_primary_id(),
        }
    }
}

impl MappingConfig {
    /// Parses a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the JSON is malformed or has the wrong shape.
    pub fn from_json(json: &str) -> DocumentStoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Compiles this configuration into a [`FieldMapper`].
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidConfiguration`](crate::error::DocumentStoreError::InvalidConfiguration)
    /// if a pattern does not compile or two stored fields share an application name.
    pub fn build_mapper(&self) -> DocumentStoreResult<FieldMapper> {
        let renames = RenameTable::from_pairs(
            self.fields_props
                .iter()
                .map(|(stored, application)| (stored.as_str(), application.as_str())),
        )?;

        let mut id_fields = IdFieldSet::new();
        for spec in &self.id_fields {
            id_fields.push(spec.compile()?);
        }

        Ok(FieldMapper::new(renames, id_fields).with_primary_id(self.primary_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocumentStoreError;

    #[test]
    fn test_from_json() {
        let config = MappingConfig::from_json(
            r#"{
                "fields_props": { "_id": "id", "usr_name": "username" },
                "id_fields": ["_id", { "pattern": "_ref$" }]
            }"#,
        )
        .unwrap();

        assert_eq!(config.primary_id, "_id");
        assert_eq!(
            config.id_fields,
            vec![
                IdFieldSpec::Exact("_id".to_string()),
                IdFieldSpec::Pattern { pattern: "_ref$".to_string() },
            ]
        );

        let mapper = config.build_mapper().unwrap();
        assert_eq!(mapper.renames().stored_name("username"), "usr_name");
        assert!(mapper.is_identifier_field("id"));
        assert!(mapper.is_identifier_field("owner_ref"));
        assert!(!mapper.is_identifier_field("username"));
    }

    #[test]
    fn test_bad_pattern_is_rejected() {
        let config = MappingConfig {
            id_fields: vec![IdFieldSpec::Pattern { pattern: "(".to_string() }],
            ..Default::default()
        };

        let err = config.build_mapper().unwrap_err();
        assert!(matches!(err, DocumentStoreError::InvalidConfiguration(_)));
        assert!(err.is_fatal());
    }
}
