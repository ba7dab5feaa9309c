//! Event store trait and the in-memory implementation

use crate::error::{Result, StoreError};
use crate::record::{Event, StoredEventRecord};
use parking_lot::Mutex;

/// Append-only storage for analytics events.
///
/// Implementations assign a unique, strictly increasing `id` to every appended
/// event and must not report success from `append` until the record is
/// committed.
#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    /// Open connections and create the schema
    async fn initialize(&mut self) -> Result<()>;

    /// Persist one event and return the stored record
    async fn append(&self, event: Event) -> Result<StoredEventRecord>;

    /// All stored records, ordered by id ascending
    async fn list_all(&self) -> Result<Vec<StoredEventRecord>>;

    /// Up to `limit` records with `id > after_id`, ordered by id ascending
    async fn list_after(&self, after_id: i64, limit: usize) -> Result<Vec<StoredEventRecord>>;

    /// Number of stored records
    async fn count(&self) -> Result<u64>;

    /// Verify the store handle is usable
    async fn health_check(&self) -> Result<()>;

    /// Release the store handle. Further calls fail.
    async fn close(&self);
}

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<StoredEventRecord>,
    next_id: i64,
    initialized: bool,
    closed: bool,
}

/// In-memory event store (for testing and demos)
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    state: Mutex<MemoryState>,
}

impl InMemoryEventStore {
    /// Create a new, uninitialized in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an in-memory store that is ready for use
    pub fn initialized() -> Self {
        let store = Self::new();
        store.state.lock().initialized = true;
        store
    }

    fn ensure_open(state: &MemoryState) -> Result<()> {
        if !state.initialized {
            return Err(StoreError::invalid_operation("Event store not initialized"));
        }
        if state.closed {
            return Err(StoreError::unavailable("Event store closed"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl EventStore for InMemoryEventStore {
    async fn initialize(&mut self) -> Result<()> {
        let state = self.state.get_mut();
        if state.initialized {
            return Ok(());
        }

        state.initialized = true;
        state.closed = false;

        tracing::info!("In-memory event store initialized");

        Ok(())
    }

    async fn append(&self, event: Event) -> Result<StoredEventRecord> {
        let mut state = self.state.lock();
        Self::ensure_open(&state)?;

        state.next_id += 1;
        let record = StoredEventRecord::from_event(state.next_id, event);
        state.records.push(record.clone());

        Ok(record)
    }

    async fn list_all(&self) -> Result<Vec<StoredEventRecord>> {
        let state = self.state.lock();
        Self::ensure_open(&state)?;
        Ok(state.records.clone())
    }

    async fn list_after(&self, after_id: i64, limit: usize) -> Result<Vec<StoredEventRecord>> {
        let state = self.state.lock();
        Self::ensure_open(&state)?;

        // Records are pushed in id order, so the tail after `after_id` is contiguous
        let start = state.records.partition_point(|r| r.id <= after_id);
        Ok(state.records[start..].iter().take(limit).cloned().collect())
    }

    async fn count(&self) -> Result<u64> {
        let state = self.state.lock();
        Self::ensure_open(&state)?;
        Ok(state.records.len() as u64)
    }

    async fn health_check(&self) -> Result<()> {
        let state = self.state.lock();
        Self::ensure_open(&state)
    }

    async fn close(&self) {
        self.state.lock().closed = true;
        tracing::info!("In-memory event store closed");
    }
}
