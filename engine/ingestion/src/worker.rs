//! # Persistence Worker
//!
//! The single consumer of the ingestion buffer. On every tick (or early, when
//! the buffer reaches its high watermark) it drains one batch and appends each
//! event to the store.
//!
//! A failed or timed-out write is logged and dead-lettered; it never stops the
//! rest of the batch or the loop. Cycles are serialized by a lock, so a manual
//! [`PersistenceWorker::run_cycle`] never overlaps a scheduled one.

use crate::buffer::IngestionBuffer;
use crate::config::WorkerConfig;
use crate::dead_letter::{DeadLetter, DeadLetterQueue};
use crate::metrics::IngestionMetrics;
use chrono::Utc;
use event_store::{Event, EventStore, StoredEventRecord};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{timeout, timeout_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Outcome of one drain+write cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub drained: usize,
    pub persisted: usize,
    pub failed: usize,
}

/// Outcome of the final flush when the worker stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    pub flushed: usize,
    pub failed: usize,
    pub remaining: usize,
    pub timed_out: bool,
}

pub struct PersistenceWorker {
    config: WorkerConfig,
    buffer: Arc<IngestionBuffer>,
    store: Arc<dyn EventStore>,
    dead_letters: Option<Arc<DeadLetterQueue>>,
    metrics: Arc<IngestionMetrics>,
    cycle_lock: Mutex<()>,
}

impl PersistenceWorker {
    pub fn new(
        config: WorkerConfig,
        buffer: Arc<IngestionBuffer>,
        store: Arc<dyn EventStore>,
        dead_letters: Option<Arc<DeadLetterQueue>>,
        metrics: Arc<IngestionMetrics>,
    ) -> Self {
        Self { config, buffer, store, dead_letters, metrics, cycle_lock: Mutex::new(()) }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Drain one batch and write each event to the store
    pub async fn run_cycle(&self) -> CycleReport {
        let _cycle = self.cycle_lock.lock().await;
        let started = Instant::now();

        let batch = self.buffer.drain(self.config.batch_size);
        let mut report = CycleReport { drained: batch.len(), ..Default::default() };
        self.metrics.cycles_total.inc();

        if batch.is_empty() {
            return report;
        }

        for event in batch {
            match self.persist(event, None).await {
                Ok(_) => report.persisted += 1,
                Err(letter) => {
                    report.failed += 1;
                    self.dead_letter(letter);
                }
            }
        }

        self.metrics.events_persisted_total.add(report.persisted as u64);
        self.metrics.last_cycle_duration_us.set(started.elapsed().as_micros() as u64);

        debug!(
            "Persistence cycle: drained={}, persisted={}, failed={}, remaining={}, took={:?}",
            report.drained,
            report.persisted,
            report.failed,
            self.buffer.len(),
            started.elapsed()
        );

        report
    }

    /// Write one event, retrying up to `max_write_attempts` times.
    ///
    /// With a deadline, each attempt is cut short at the deadline and no
    /// retry starts after it.
    async fn persist(
        &self,
        event: Event,
        deadline: Option<Instant>,
    ) -> Result<StoredEventRecord, DeadLetter> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            let limit = match deadline {
                Some(deadline) => {
                    self.config.write_timeout().min(deadline.saturating_duration_since(Instant::now()))
                }
                None => self.config.write_timeout(),
            };

            let error = match timeout(limit, self.store.append(event.clone())).await {
                Ok(Ok(record)) => return Ok(record),
                Ok(Err(e)) => e.to_string(),
                Err(_) => {
                    self.metrics.write_timeouts_total.inc();
                    format!("write timed out after {}ms", limit.as_millis())
                }
            };

            let past_deadline = deadline.is_some_and(|d| Instant::now() >= d);
            if attempts >= self.config.max_write_attempts || past_deadline {
                self.metrics.write_failures_total.inc();
                error!(
                    "Failed to persist event (site_id={}, event_type={}) after {} attempt(s): {}",
                    event.site_id, event.event_type, attempts, error
                );
                return Err(DeadLetter { event, error, failed_at: Utc::now(), attempts });
            }

            warn!(
                "Write attempt {} for event (site_id={}, event_type={}) failed: {}",
                attempts, event.site_id, event.event_type, error
            );
            tokio::time::sleep(self.config.retry_backoff() * attempts).await;
        }
    }

    fn dead_letter(&self, letter: DeadLetter) {
        let Some(queue) = &self.dead_letters else {
            return;
        };

        self.metrics.events_dead_lettered_total.inc();
        if let Some(evicted) = queue.push(letter) {
            warn!(
                "Dead-letter queue full (capacity {}), evicted event (site_id={}, event_type={})",
                queue.capacity(),
                evicted.event.site_id,
                evicted.event.event_type
            );
        }
    }

    /// Run the worker loop until `shutdown` turns true or its sender is dropped,
    /// then flush what is left in the buffer.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> ShutdownReport {
        info!(
            "Starting persistence worker (interval={}ms, batch_size={}, high_watermark={})",
            self.config.tick_interval_ms,
            self.config.batch_size,
            self.buffer.high_watermark()
        );

        let mut ticker = tokio::time::interval(self.config.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = self.buffer.watermark_reached() => {
                    debug!("High watermark reached (depth={}), running early cycle", self.buffer.len());
                    self.run_cycle().await;
                }
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }

        info!("Persistence worker stopping, buffer depth={}", self.buffer.len());
        self.flush_remaining().await
    }

    /// Persist what is left, one event at a time, until the buffer is empty
    /// or the flush deadline passes. Events not attempted stay in the buffer.
    async fn flush_remaining(&self) -> ShutdownReport {
        let mut report = ShutdownReport::default();

        if self.config.flush_on_shutdown {
            let deadline = Instant::now() + self.config.shutdown_flush_timeout();
            report.timed_out = !self.flush_until(deadline, &mut report).await;
        }

        report.remaining = self.buffer.len();

        if report.remaining > 0 {
            warn!(
                "Persistence worker stopped with {} unflushed event(s) (timed_out={})",
                report.remaining, report.timed_out
            );
        } else {
            info!(
                "Persistence worker stopped: flushed={}, failed={}",
                report.flushed, report.failed
            );
        }

        report
    }

    /// Returns false if the deadline cut the flush short
    async fn flush_until(&self, deadline: Instant, report: &mut ShutdownReport) -> bool {
        let Ok(_cycle) = timeout_at(deadline, self.cycle_lock.lock()).await else {
            return self.buffer.is_empty();
        };

        while !self.buffer.is_empty() {
            if Instant::now() >= deadline {
                return false;
            }

            for event in self.buffer.drain(1) {
                match self.persist(event, Some(deadline)).await {
                    Ok(_) => {
                        report.flushed += 1;
                        self.metrics.events_persisted_total.inc();
                    }
                    Err(letter) => {
                        report.failed += 1;
                        let cut_short = Instant::now() >= deadline;
                        self.dead_letter(letter);
                        if cut_short {
                            return false;
                        }
                    }
                }
            }
        }

        true
    }

    /// Spawn the loop onto the tokio runtime
    pub fn spawn(self: Arc<Self>) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(async move { self.run(shutdown_rx).await });
        WorkerHandle { shutdown_tx, join }
    }
}

/// Handle to a spawned persistence worker
pub struct WorkerHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<ShutdownReport>,
}

impl WorkerHandle {
    /// Ask the worker to stop without waiting for it
    pub fn signal_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop the worker and wait for its final flush
    pub async fn shutdown(self) -> Result<ShutdownReport, JoinError> {
        self.signal_shutdown();
        self.join.await
    }

    /// Like [`WorkerHandle::shutdown`], but abort the task if it has not
    /// finished within `limit`. Returns `None` when the task was aborted.
    pub async fn shutdown_within(
        mut self,
        limit: Duration,
    ) -> Option<Result<ShutdownReport, JoinError>> {
        self.signal_shutdown();
        match timeout(limit, &mut self.join).await {
            Ok(result) => Some(result),
            Err(_) => {
                self.join.abort();
                None
            }
        }
    }
}
