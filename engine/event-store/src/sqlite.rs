//! SQLite-backed event store

use crate::backend::EventStore;
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::record::{Event, StoredEventRecord};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::Row;
use std::path::Path;
use std::time::Duration;

const CREATE_EVENTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        site_id TEXT,
        event_type TEXT,
        path TEXT,
        user_id TEXT,
        timestamp TEXT
    )
"#;

const INSERT_EVENT: &str = r#"
    INSERT INTO events (site_id, event_type, path, user_id, timestamp)
    VALUES (?, ?, ?, ?, ?)
"#;

const SELECT_ALL: &str =
    "SELECT id, site_id, event_type, path, user_id, timestamp FROM events ORDER BY id ASC";

const SELECT_AFTER: &str = r#"
    SELECT id, site_id, event_type, path, user_id, timestamp FROM events
    WHERE id > ? ORDER BY id ASC LIMIT ?
"#;

/// Durable event store on a single SQLite file.
///
/// The database runs in WAL mode with `synchronous=FULL`, so a successful
/// `append` has been fsynced before it returns.
pub struct SqliteEventStore {
    config: StoreConfig,
    pool: Option<SqlitePool>,
}

impl SqliteEventStore {
    /// Create a new SQLite store. Call `initialize` before use.
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate().map_err(StoreError::config)?;
        Ok(Self { config, pool: None })
    }

    /// Create a new SQLite store at the given path with default settings
    pub fn with_default_config(database_path: impl Into<std::path::PathBuf>) -> Result<Self> {
        Self::new(StoreConfig::new(database_path))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn database_path(&self) -> &Path {
        &self.config.database_path
    }

    fn pool(&self) -> Result<&SqlitePool> {
        self.pool
            .as_ref()
            .ok_or_else(|| StoreError::invalid_operation("Event store not initialized"))
    }
}

/// Map a row to a record. Columns written by older writers may be NULL.
fn record_from_row(row: &SqliteRow) -> Result<StoredEventRecord> {
    let text = |column: &str| -> Result<String> {
        Ok(row.try_get::<Option<String>, _>(column)?.unwrap_or_default())
    };

    Ok(StoredEventRecord {
        id: row.try_get("id")?,
        site_id: text("site_id")?,
        event_type: text("event_type")?,
        path: text("path")?,
        user_id: text("user_id")?,
        timestamp: text("timestamp")?,
    })
}

#[async_trait::async_trait]
impl EventStore for SqliteEventStore {
    async fn initialize(&mut self) -> Result<()> {
        if self.pool.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.config.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&self.config.database_path)
            .create_if_missing(self.config.create_if_missing)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full)
            .busy_timeout(Duration::from_millis(self.config.busy_timeout_ms));

        let pool = SqlitePoolOptions::new()
            .max_connections(self.config.max_connections)
            .acquire_timeout(Duration::from_millis(self.config.acquire_timeout_ms))
            .connect_with(options)
            .await?;

        sqlx::query(CREATE_EVENTS_TABLE).execute(&pool).await?;

        self.pool = Some(pool);

        tracing::info!("SQLite event store initialized at: {:?}", self.config.database_path);

        Ok(())
    }

    async fn append(&self, event: Event) -> Result<StoredEventRecord> {
        let result = sqlx::query(INSERT_EVENT)
            .bind(event.site_id.as_str())
            .bind(event.event_type.as_str())
            .bind(event.path.as_str())
            .bind(event.user_id.as_str())
            .bind(event.timestamp.as_str())
            .execute(self.pool()?)
            .await?;

        Ok(StoredEventRecord::from_event(result.last_insert_rowid(), event))
    }

    async fn list_all(&self) -> Result<Vec<StoredEventRecord>> {
        let rows = sqlx::query(SELECT_ALL).fetch_all(self.pool()?).await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn list_after(&self, after_id: i64, limit: usize) -> Result<Vec<StoredEventRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(SELECT_AFTER)
            .bind(after_id)
            .bind(limit)
            .fetch_all(self.pool()?)
            .await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM events").fetch_one(self.pool()?).await?;
        Ok(count.max(0) as u64)
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(self.pool()?).await?;
        Ok(())
    }

    async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
            tracing::info!("SQLite event store closed");
        }
    }
}
