//! In-memory store driver for docmap.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreDriver` trait.
//! It uses async-aware read-write locks for concurrent access and is meant for development
//! and tests.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Document filters** - Equality, comparison, `$in`/`$nin`, `$exists` and logical operators
//! - **Update operators** - `$set`, `$unset` and `$inc`
//! - **Find options** - Sorting, skip, limit and projection
//!
//! # Quick Start
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
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = InMemoryStore::builder().build().await?;
//!     let users: Repository<_, User> = RepositoryBuilder::new(&store, "users")
//!         .rename("_id", "id")
//!         .id_field("_id")
//!         .build()?;
//!
//!     users.insert(&User { id: None, username: "ann".to_string() }).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmap_memory;

pub mod store;
pub mod evaluator;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
