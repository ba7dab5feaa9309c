//! Request and response bodies for the EventGateway HTTP API

use ingestion::{DeadLetter, PipelineStats};
use serde::{Deserialize, Serialize};

/// Acknowledgment for an accepted event
#[derive(Debug, Serialize, Deserialize)]
pub struct QueuedResponse {
    pub status: String,
    pub depth: usize,
}

impl QueuedResponse {
    pub fn queued(depth: usize) -> Self {
        Self { status: "queued".to_string(), depth }
    }
}

/// Query parameters for `GET /events`
#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    pub after_id: Option<i64>,
    pub limit: Option<usize>,
}

/// Body of `GET /stats`
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub pipeline: PipelineStats,
    /// Stored record count, absent if the store could not be read
    pub stored_events: Option<u64>,
}

/// Body of `GET /health`
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
    pub buffer_depth: usize,
    pub buffer_capacity: usize,
    pub timestamp: String,
}

/// Body of `GET /dead-letters`
#[derive(Debug, Serialize)]
pub struct DeadLettersResponse {
    pub count: usize,
    pub evicted: u64,
    pub letters: Vec<DeadLetter>,
}
