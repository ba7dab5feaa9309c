//! Pulse Production Service Library
//!
//! Wires the event store, the ingestion pipeline and the HTTP gateway into one
//! process, with configuration loading, logging and graceful shutdown.

use anyhow::{Context, Result};
use std::path::Path;

pub mod config;
pub mod logging;
pub mod service;
pub mod signals;

pub use config::{LoggingConfig, ServiceConfig, ServiceSettings};
pub use logging::{initialize_logging, LoggingGuard};
pub use service::ServiceState;
pub use signals::setup_signal_handlers;

/// Load configuration from an optional file and environment variables
pub fn load_configuration(path: Option<&Path>) -> Result<ServiceConfig> {
    config::load_config(path).context("Failed to load service configuration")
}
