//! Storage layer for the Stacks event sidecar.
//!
//! This crate provides the implementations of the `DataStore` port
//! defined in `sidecar-core`:
//!
//! - [`InMemoryStore`] - RAM only, for tests and database-less runs
//! - [`postgres::PgStore`] - PostgreSQL, with pooling and migrations
//!
//! # Usage
//!
//! ```ignore
//! use sidecar_storage::{Database, DatabaseConfig, PgStore};
//!
//! let config = DatabaseConfig::for_sidecar(&database_url);
//! let db = Database::connect(&config).await?;
//! db.migrate().await?;
//!
//! let store = Arc::new(PgStore::new(Arc::new(db)));
//! ```

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::{Database, DatabaseConfig, PgStore, PurgeStats};
