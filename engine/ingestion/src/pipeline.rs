//! # Ingestion Pipeline
//!
//! Intake-side facade: validates a payload, stamps it, and enqueues it. Also
//! owns the pieces the persistence worker is built from.

use crate::buffer::IngestionBuffer;
use crate::config::IngestionConfig;
use crate::dead_letter::{DeadLetter, DeadLetterQueue};
use crate::error::{IngestionError, Result};
use crate::metrics::{IngestionMetrics, MetricsSnapshot};
use crate::validator;
use crate::worker::PersistenceWorker;
use chrono::Utc;
use event_store::{Event, EventStore};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// An event accepted into the buffer
#[derive(Debug, Clone, Serialize)]
pub struct Admission {
    pub event: Event,
    /// Buffer depth right after the enqueue
    pub depth: usize,
}

/// Observable state of the pipeline
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    pub buffer_depth: usize,
    pub buffer_capacity: usize,
    pub high_watermark: usize,
    pub dead_letters: usize,
    pub dead_letters_evicted: u64,
    pub metrics: MetricsSnapshot,
}

#[derive(Debug)]
pub struct IngestionPipeline {
    config: IngestionConfig,
    buffer: Arc<IngestionBuffer>,
    dead_letters: Option<Arc<DeadLetterQueue>>,
    metrics: Arc<IngestionMetrics>,
}

impl IngestionPipeline {
    /// Create the pipeline and its buffer
    pub fn new(config: IngestionConfig) -> Result<Self> {
        config.validate().map_err(IngestionError::Config)?;

        let buffer = Arc::new(IngestionBuffer::from_config(&config.buffer));
        let dead_letters = DeadLetterQueue::from_config(&config.dead_letter).map(Arc::new);

        Ok(Self { config, buffer, dead_letters, metrics: Arc::new(IngestionMetrics::new()) })
    }

    pub fn config(&self) -> &IngestionConfig {
        &self.config
    }

    pub fn buffer(&self) -> &Arc<IngestionBuffer> {
        &self.buffer
    }

    pub fn metrics(&self) -> &Arc<IngestionMetrics> {
        &self.metrics
    }

    /// Validate `raw`, fill in a missing timestamp, and enqueue it.
    ///
    /// Nothing is enqueued when validation fails. A full buffer returns
    /// [`IngestionError::BufferFull`] immediately.
    pub fn submit(&self, raw: &Value) -> Result<Admission> {
        let event = match validator::validate(raw) {
            Ok(event) => event.stamped_at(Utc::now()),
            Err(e) => {
                self.metrics.events_rejected_invalid_total.inc();
                debug!("Rejected invalid event: {}", e);
                return Err(e.into());
            }
        };

        self.enqueue(event)
    }

    /// Enqueue an already-validated event
    pub fn enqueue(&self, event: Event) -> Result<Admission> {
        match self.buffer.enqueue(event.clone()) {
            Ok(depth) => {
                self.metrics.events_accepted_total.inc();
                debug!(
                    "Event queued (site_id={}, event_type={}), depth={}",
                    event.site_id, event.event_type, depth
                );
                Ok(Admission { event, depth })
            }
            Err(full) => {
                self.metrics.events_rejected_full_total.inc();
                warn!("Ingestion buffer full ({} events), rejecting event", full.capacity);
                Err(full.into())
            }
        }
    }

    /// Build the single persistence worker for this pipeline
    pub fn worker(&self, store: Arc<dyn EventStore>) -> PersistenceWorker {
        PersistenceWorker::new(
            self.config.worker.clone(),
            self.buffer.clone(),
            store,
            self.dead_letters.clone(),
            self.metrics.clone(),
        )
    }

    /// Copy of the current dead letters, oldest first
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.as_ref().map(|q| q.snapshot()).unwrap_or_default()
    }

    /// Remove and return all dead letters
    pub fn take_dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.as_ref().map(|q| q.drain()).unwrap_or_default()
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            buffer_depth: self.buffer.len(),
            buffer_capacity: self.buffer.capacity(),
            high_watermark: self.buffer.high_watermark(),
            dead_letters: self.dead_letters.as_ref().map_or(0, |q| q.len()),
            dead_letters_evicted: self.dead_letters.as_ref().map_or(0, |q| q.evicted_count()),
            metrics: self.metrics.snapshot(),
        }
    }
}
