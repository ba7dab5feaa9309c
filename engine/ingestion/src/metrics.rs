// Counters for intake and the persistence worker

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Pipeline counters, shared between the intake path and the worker
#[derive(Debug)]
pub struct IngestionMetrics {
    // Intake
    pub events_accepted_total: AtomicCounter,
    pub events_rejected_invalid_total: AtomicCounter,
    pub events_rejected_full_total: AtomicCounter,

    // Worker
    pub cycles_total: AtomicCounter,
    pub events_persisted_total: AtomicCounter,
    pub write_failures_total: AtomicCounter,
    pub write_timeouts_total: AtomicCounter,
    pub events_dead_lettered_total: AtomicCounter,
    pub last_cycle_duration_us: AtomicCounter,

    pub started_at: Instant,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self {
            events_accepted_total: AtomicCounter::new(),
            events_rejected_invalid_total: AtomicCounter::new(),
            events_rejected_full_total: AtomicCounter::new(),
            cycles_total: AtomicCounter::new(),
            events_persisted_total: AtomicCounter::new(),
            write_failures_total: AtomicCounter::new(),
            write_timeouts_total: AtomicCounter::new(),
            events_dead_lettered_total: AtomicCounter::new(),
            last_cycle_duration_us: AtomicCounter::new(),
            started_at: Instant::now(),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_accepted_total: self.events_accepted_total.get(),
            events_rejected_invalid_total: self.events_rejected_invalid_total.get(),
            events_rejected_full_total: self.events_rejected_full_total.get(),
            cycles_total: self.cycles_total.get(),
            events_persisted_total: self.events_persisted_total.get(),
            write_failures_total: self.write_failures_total.get(),
            write_timeouts_total: self.write_timeouts_total.get(),
            events_dead_lettered_total: self.events_dead_lettered_total.get(),
            last_cycle_duration_us: self.last_cycle_duration_us.get(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
        }
    }
}

impl Default for IngestionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`IngestionMetrics`]
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub events_accepted_total: u64,
    pub events_rejected_invalid_total: u64,
    pub events_rejected_full_total: u64,
    pub cycles_total: u64,
    pub events_persisted_total: u64,
    pub write_failures_total: u64,
    pub write_timeouts_total: u64,
    pub events_dead_lettered_total: u64,
    pub last_cycle_duration_us: u64,
    pub uptime_seconds: u64,
}

/// Thread-safe atomic counter
#[derive(Debug)]
pub struct AtomicCounter {
    value: AtomicU64,
}

impl AtomicCounter {
    pub fn new() -> Self {
        Self { value: AtomicU64::new(0) }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, delta: u64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn set(&self, value: u64) {
        self.value.store(value, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Default for AtomicCounter {
    fn default() -> Self {
        Self::new()
    }
}
