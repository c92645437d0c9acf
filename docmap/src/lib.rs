//! Main docmap crate providing field-mapped data access over document stores.
//!
//! This crate is the primary entry point for users of docmap. It re-exports the core types
//! from `docmap-core` and provides access to the available store drivers.
//!
//! # Features
//!
//! - **Field renaming** - Keep stored field names (`usr_name`) out of your domain types (`username`)
//! - **Identifier coercion** - Work with string identifiers while the store keeps native `ObjectId`s
//! - **Uniform CRUD** - `count`, `delete`, `insert`, `select`, `select_one`, `update` on every collection
//! - **Multiple drivers** - In-memory and MongoDB drivers behind one trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docmap::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     pub id: Option<String>,
//!     pub username: String,
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = InMemoryStore::builder().build().await.unwrap();
//!
//!     let users: Repository<_, User> = RepositoryBuilder::new(&store, "users")
//!         .rename("_id", "id")
//!         .rename("usr_name", "username")
//!         .id_field("_id")
//!         .build()
//!         .unwrap();
//!
//!     // Stored as { _id: ObjectId(..), usr_name: "ann" }
//!     let id = users
//!         .insert(&User { id: None, username: "ann".to_string() })
//!         .await
//!         .unwrap();
//!
//!     // Filters use application names and string identifiers
//!     let ann = users
//!         .select_one(Some(&doc! { "id": id.as_str() }), None)
//!         .await
//!         .unwrap();
//!
//!     println!("Selected user: {:?}", ann);
//! }
//! ```
//!
//! # Configuration
//!
//! Mappings can also be loaded from JSON:
//!
//! ```ignore
//! let config = MappingConfig::from_json(r#"{
//!     "fields_props": { "_id": "id", "usr_name": "username" },
//!     "id_fields": ["_id", { "pattern": "_ref$" }]
//! }"#)?;
//!
//! let users: Repository<_, User> = RepositoryBuilder::new(&store, "users")
//!     .config(config)
//!     .build()?;
//! ```
//!
//! # Drivers
//!
//! - [`memory`] - In-memory driver for development and testing
//! - [`mongodb`] - MongoDB driver (requires `mongodb` feature)

pub mod prelude;

pub use docmap_core::{config, document, driver, error, mapping, options, repository};

// Re-export BSON types for convenience
pub use bson;

/// In-memory store driver.
pub mod memory {
    pub use docmap_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB store driver.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmap_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
