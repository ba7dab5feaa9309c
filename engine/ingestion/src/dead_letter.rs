//! Dead-letter queue for events the worker could not persist

use crate::config::DeadLetterConfig;
use chrono::{DateTime, Utc};
use event_store::Event;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// An event that failed to persist
#[derive(Debug, Clone, Serialize)]
pub struct DeadLetter {
    pub event: Event,
    pub error: String,
    pub failed_at: DateTime<Utc>,
    pub attempts: u32,
}

/// Bounded holding area for failed writes.
///
/// Dead letters are kept for inspection only; nothing writes them back to the
/// store automatically. When full, the oldest letter is evicted.
#[derive(Debug)]
pub struct DeadLetterQueue {
    letters: Mutex<VecDeque<DeadLetter>>,
    capacity: usize,
    evicted: AtomicU64,
}

impl DeadLetterQueue {
    pub fn new(capacity: usize) -> Self {
        Self { letters: Mutex::new(VecDeque::new()), capacity, evicted: AtomicU64::new(0) }
    }

    /// Returns `None` when dead-lettering is disabled
    pub fn from_config(config: &DeadLetterConfig) -> Option<Self> {
        config.enabled.then(|| Self::new(config.capacity))
    }

    /// Add a dead letter, returning the one evicted to make room, if any
    pub fn push(&self, letter: DeadLetter) -> Option<DeadLetter> {
        let mut letters = self.letters.lock();
        let evicted = if letters.len() >= self.capacity {
            self.evicted.fetch_add(1, Ordering::Relaxed);
            letters.pop_front()
        } else {
            None
        };
        letters.push_back(letter);
        evicted
    }

    pub fn len(&self) -> usize {
        self.letters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of dead letters dropped because the queue was full
    pub fn evicted_count(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    /// Copy of the current dead letters, oldest first
    pub fn snapshot(&self) -> Vec<DeadLetter> {
        self.letters.lock().iter().cloned().collect()
    }

    /// Remove and return all dead letters, oldest first
    pub fn drain(&self) -> Vec<DeadLetter> {
        self.letters.lock().drain(..).collect()
    }
}
