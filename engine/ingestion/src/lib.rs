//! # Ingestion
//!
//! The ingestion pipeline for Pulse analytics events.
//!
//! Intake validates a payload and appends it to a bounded buffer; a single
//! persistence worker drains that buffer on a fixed cadence and writes each
//! event to the [`event_store::EventStore`].
//!
//! ```text
//! intake -> validator -> IngestionBuffer -> PersistenceWorker -> EventStore
//! ```
//!
//! A full buffer rejects new events immediately instead of growing without
//! bound. Events whose write fails are kept in a dead-letter queue rather than
//! retried forever.

pub mod buffer;
pub mod config;
pub mod dead_letter;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod validator;
pub mod worker;

// Re-export main types for easy usage
pub use buffer::{BufferFull, IngestionBuffer};
pub use config::{BufferConfig, DeadLetterConfig, IngestionConfig, WorkerConfig};
pub use dead_letter::{DeadLetter, DeadLetterQueue};
pub use error::{IngestionError, Result};
pub use metrics::{IngestionMetrics, MetricsSnapshot};
pub use pipeline::{Admission, IngestionPipeline, PipelineStats};
pub use validator::{validate, ValidationError};
pub use worker::{CycleReport, PersistenceWorker, ShutdownReport, WorkerHandle};

pub use event_store::{Event, StoredEventRecord};
