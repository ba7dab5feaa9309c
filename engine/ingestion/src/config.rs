//! # Configuration Management
//!
//! Configuration structures for the ingestion buffer, persistence worker and
//! dead-letter queue.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration for the ingestion pipeline
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IngestionConfig {
    /// Buffer configuration
    pub buffer: BufferConfig,
    /// Persistence worker configuration
    pub worker: WorkerConfig,
    /// Dead-letter configuration
    pub dead_letter: DeadLetterConfig,
}

/// Ingestion buffer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Maximum number of events held before enqueue returns `Full`
    pub capacity: usize,
    /// Depth at which the worker is woken before its next tick (0 disables).
    /// Unset means 80% of `capacity`.
    pub high_watermark: Option<usize>,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self { capacity: 10_000, high_watermark: None }
    }
}

impl BufferConfig {
    /// Watermark actually applied to the buffer
    pub fn effective_high_watermark(&self) -> usize {
        self.high_watermark.unwrap_or(self.capacity * 4 / 5)
    }
}

/// Persistence worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Interval between drain cycles (milliseconds)
    pub tick_interval_ms: u64,
    /// Maximum number of events drained per cycle
    pub batch_size: usize,
    /// Timeout for a single store write (milliseconds)
    pub write_timeout_ms: u64,
    /// Write attempts per event before it is dead-lettered
    pub max_write_attempts: u32,
    /// Pause between write attempts (milliseconds)
    pub retry_backoff_ms: u64,
    /// Drain the buffer before exiting on shutdown
    pub flush_on_shutdown: bool,
    /// Upper bound on the shutdown flush (milliseconds)
    pub shutdown_flush_timeout_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
            batch_size: 500,
            write_timeout_ms: 5_000,
            max_write_attempts: 1,
            retry_backoff_ms: 100,
            flush_on_shutdown: true,
            shutdown_flush_timeout_ms: 10_000,
        }
    }
}

impl WorkerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn shutdown_flush_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_flush_timeout_ms)
    }
}

/// Dead-letter queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadLetterConfig {
    /// Keep events that failed to persist
    pub enabled: bool,
    /// Maximum dead letters held; the oldest is evicted when full
    pub capacity: usize,
}

impl Default for DeadLetterConfig {
    fn default() -> Self {
        Self { enabled: true, capacity: 1_000 }
    }
}

impl IngestionConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.buffer.capacity == 0 {
            return Err("buffer.capacity must be greater than 0".to_string());
        }

        if let Some(high_watermark) = self.buffer.high_watermark {
            if high_watermark > self.buffer.capacity {
                return Err(format!(
                    "buffer.high_watermark ({}) must not exceed buffer.capacity ({})",
                    high_watermark, self.buffer.capacity
                ));
            }
        }

        if self.worker.tick_interval_ms == 0 {
            return Err("worker.tick_interval_ms must be greater than 0".to_string());
        }

        if self.worker.batch_size == 0 {
            return Err("worker.batch_size must be greater than 0".to_string());
        }

        if self.worker.write_timeout_ms == 0 {
            return Err("worker.write_timeout_ms must be greater than 0".to_string());
        }

        if self.worker.max_write_attempts == 0 {
            return Err("worker.max_write_attempts must be at least 1".to_string());
        }

        if self.dead_letter.enabled && self.dead_letter.capacity == 0 {
            return Err("dead_letter.capacity must be greater than 0 when enabled".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = IngestionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.worker.tick_interval(), Duration::from_secs(1));
        assert!(config.buffer.capacity >= 1_000);
    }

    #[test]
    fn test_watermark_above_capacity_rejected() {
        let mut config = IngestionConfig::default();
        config.buffer.capacity = 10;
        config.buffer.high_watermark = Some(11);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = IngestionConfig::default();
        config.worker.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: IngestionConfig =
            serde_json::from_str(r#"{"buffer": {"capacity": 50, "high_watermark": 0}}"#).unwrap();
        assert_eq!(config.buffer.capacity, 50);
        assert_eq!(config.buffer.effective_high_watermark(), 0);
        assert_eq!(config.worker.batch_size, WorkerConfig::default().batch_size);
        assert!(config.dead_letter.enabled);
    }

    #[test]
    fn test_watermark_follows_capacity_when_unset() {
        let config: IngestionConfig =
            serde_json::from_str(r#"{"buffer": {"capacity": 5000}}"#).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.buffer.high_watermark, None);
        assert_eq!(config.buffer.effective_high_watermark(), 4_000);

        let small = BufferConfig { capacity: 2, high_watermark: None };
        assert_eq!(small.effective_high_watermark(), 1);
        assert_eq!(BufferConfig::default().effective_high_watermark(), 8_000);
    }
}
