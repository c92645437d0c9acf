//! Convenient re-exports of commonly used types from docmap.
//!
//! ```ignore
//! use docmap::prelude::*;
//! ```

pub use docmap_core::{
    config::{IdFieldSpec, MappingConfig},
    document::{FromDocument, ToDocument},
    driver::{CollectionDescriptor, StoreDriver, StoreDriverBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    mapping::{FieldMapper, IdFieldSelector, IdFieldSet, RenameTable},
    options::{FindOptions, FindOptionsBuilder, Sort, SortDirection},
    repository::{Repository, RepositoryBuilder},
};
