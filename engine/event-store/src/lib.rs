//! # Event Store
//!
//! Durable, append-only storage for Pulse analytics events.
//!
//! ## Architecture
//!
//! - **EventStore**: Abstract trait the persistence worker writes through and the
//!   reporting routes read from
//! - **SqliteEventStore**: SQLite implementation, the durable default
//! - **InMemoryEventStore**: Volatile implementation for tests and demos
//!
//! Every stored record carries a storage-assigned `id` that strictly increases
//! with each append. Records are never updated or deleted.
//!
//! ## Usage
//!
//! ```rust
//! use event_store::{Event, EventStore, SqliteEventStore};
//! use tempfile::TempDir;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let temp_dir = TempDir::new()?;
//!     let mut store = SqliteEventStore::with_default_config(temp_dir.path().join("events.db"))?;
//!     store.initialize().await?;
//!
//!     let record = store.append(Event::new("s1", "click").with_path("/pricing")).await?;
//!     assert_eq!(store.list_all().await?, vec![record]);
//!
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod record;
pub mod sqlite;

pub use backend::{EventStore, InMemoryEventStore};
pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use record::{Event, StoredEventRecord};
pub use sqlite::SqliteEventStore;
