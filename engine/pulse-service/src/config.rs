//! Service configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use event_gateway::GatewayConfig;
use event_store::StoreConfig;
use ingestion::IngestionConfig;

/// Prefix for environment overrides, e.g. `PULSE_GATEWAY__PORT=8080`
pub const ENV_PREFIX: &str = "PULSE";

/// Separator between nesting levels in environment keys
pub const ENV_SEPARATOR: &str = "__";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Event store configuration
    pub store: StoreConfig,

    /// Buffer, worker and dead-letter configuration
    pub ingestion: IngestionConfig,

    /// HTTP gateway configuration
    pub gateway: GatewayConfig,

    /// Service-level configuration
    pub service: ServiceSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Upper bound on each shutdown step (gateway drain, worker flush), in seconds
    pub shutdown_timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), overridden by `RUST_LOG`
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,

    /// Directory for a daily rolling log file (if None, logs to stdout only)
    pub directory: Option<PathBuf>,

    /// File name prefix inside `directory`
    pub file_prefix: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self { shutdown_timeout_secs: 15 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            directory: None,
            file_prefix: "pulse.log".to_string(),
        }
    }
}

/// Load configuration from defaults, an optional TOML file and `PULSE_*` variables
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut builder =
        config::Config::builder().add_source(config::Config::try_from(&ServiceConfig::default())?);

    if let Some(path) = path {
        tracing::debug!("Loading configuration from file: {:?}", path);
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config: ServiceConfig = builder.build()?.try_deserialize()?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate configuration
pub fn validate_config(config: &ServiceConfig) -> Result<(), ConfigError> {
    config.store.validate().map_err(|e| ConfigError::Invalid(format!("store: {e}")))?;
    config.ingestion.validate().map_err(|e| ConfigError::Invalid(format!("ingestion: {e}")))?;
    config.gateway.validate().map_err(|e| ConfigError::Invalid(format!("gateway: {e}")))?;

    match config.logging.level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        other => return Err(ConfigError::Invalid(format!("Invalid log level: {other}"))),
    }

    match config.logging.format.as_str() {
        "json" | "pretty" | "compact" => {}
        other => return Err(ConfigError::Invalid(format!("Invalid log format: {other}"))),
    }

    if config.service.shutdown_timeout_secs == 0 {
        return Err(ConfigError::Invalid("shutdown_timeout_secs must be greater than 0".into()));
    }

    Ok(())
}

/// Render configuration as TOML
pub fn to_toml(config: &ServiceConfig) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(config)?)
}

/// Save configuration to a TOML file
pub fn save_config(config: &ServiceConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, to_toml(config)?)?;
    Ok(())
}
