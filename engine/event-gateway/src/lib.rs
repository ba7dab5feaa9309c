//! EventGateway - HTTP API for event intake and reporting
//!
//! Accepts analytics events over `POST /event`, hands them to the ingestion
//! pipeline, and serves stored records and aggregates to dashboards.

pub mod config;
pub mod error;
pub mod gateway;
pub mod messages;
pub mod reporting;
pub mod rest_api;

pub use config::GatewayConfig;
pub use error::{ErrorResponse, GatewayError, GatewayResult};
pub use gateway::EventGateway;
pub use reporting::{summarize, EventSummary, TimelinePoint};

/// Version of the EventGateway API
pub const VERSION: &str = "0.1.0";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 3001;
