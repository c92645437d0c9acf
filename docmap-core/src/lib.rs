//! A field-mapping data access layer over document stores.
//!
//! This crate is the core of the docmap project and provides:
//!
//! - **Field/identifier mapping** ([`mapping`]) - Renames fields and coerces identifiers between
//!   application form and stored form
//! - **Repositories** ([`repository`]) - Typed CRUD facade over one collection
//! - **Store driver abstraction** ([`driver`]) - The narrow contract a document store fulfils
//! - **Find options** ([`options`]) - Pagination, sorting and projection passed through to drivers
//! - **Mapping configuration** ([`config`]) - Declarative, serde-loadable mapping setup
//! - **Record conversion** ([`document`]) - Serializing records to and from BSON documents
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use docmap::{repository::{Repository, RepositoryBuilder}, memory::InMemoryStore};
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
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmap_core;

pub mod config;
pub mod document;
pub mod driver;
pub mod error;
pub mod mapping;
pub mod options;
pub mod repository;
