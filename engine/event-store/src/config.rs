//! Configuration for the event store

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the SQLite-backed event store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the SQLite database file
    pub database_path: PathBuf,

    /// Maximum number of pooled connections
    pub max_connections: u32,

    /// How long to wait for a pooled connection, in milliseconds
    pub acquire_timeout_ms: u64,

    /// How long SQLite waits on a locked database before failing, in milliseconds
    pub busy_timeout_ms: u64,

    /// Create the database file if it does not exist
    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./data/events.db"),
            max_connections: 4,
            acquire_timeout_ms: 3_000,
            busy_timeout_ms: 5_000,
            create_if_missing: true,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration pointing at the given database file
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self { database_path: database_path.into(), ..Default::default() }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.database_path.as_os_str().is_empty() {
            return Err("database_path must not be empty".to_string());
        }

        if self.max_connections == 0 {
            return Err("max_connections must be greater than 0".to_string());
        }

        if self.acquire_timeout_ms == 0 {
            return Err("acquire_timeout_ms must be greater than 0".to_string());
        }

        Ok(())
    }
}
