//! MongoDB store driver for docmap.
//!
//! This crate provides a MongoDB-based implementation of the `StoreDriver` trait on top of the
//! official async driver. Filters, update documents and find options reach MongoDB unchanged;
//! connection pooling, timeouts and reconnection are left to the `mongodb` client.
//!
//! To use this driver, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docmap = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use docmap::{driver::StoreDriverBuilder, mongodb::MongoDbStore, repository::{Repository, RepositoryBuilder}};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MongoDbStore::builder("mongodb://localhost:27017", "my_database")
//!         .build()
//!         .await?;
//!
//!     let users: Repository<_, User> = RepositoryBuilder::new(&store, "users")
//!         .rename("_id", "id")
//!         .id_field("_id")
//!         .build()?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmap_mongodb;

pub mod store;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
