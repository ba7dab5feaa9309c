//! Configuration for the EventGateway

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Main configuration for the EventGateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Largest accepted intake body, in bytes
    pub max_body_bytes: u64,

    /// Seconds clients are told to wait after a busy response
    pub retry_after_secs: u64,

    /// Page size for `/events?after_id=` when no limit is given
    pub default_page_size: usize,

    /// Upper bound on any requested page size
    pub max_page_size: usize,

    /// Allow browser dashboards on other origins to call the API
    pub cors_allow_any_origin: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            max_body_bytes: 16 * 1024,
            retry_after_secs: 1,
            default_page_size: 500,
            max_page_size: 5_000,
            cors_allow_any_origin: true,
        }
    }
}

impl GatewayConfig {
    /// Get the server address
    pub fn server_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.server_addr().map_err(|e| format!("invalid gateway address: {e}"))?;

        if self.max_body_bytes == 0 {
            return Err("max_body_bytes must be greater than 0".to_string());
        }

        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err("default_page_size must be in 1..=max_page_size".to_string());
        }

        Ok(())
    }
}
