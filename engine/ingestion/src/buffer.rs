//! # Ingestion Buffer
//!
//! Bounded FIFO queue between intake and the persistence worker.
//!
//! - Many producers (intake requests) enqueue; one consumer (the worker) drains
//! - Non-blocking backpressure: a full buffer rejects immediately with [`BufferFull`]
//! - Fixed capacity to prevent unbounded memory growth
//! - The lock is held only for a single enqueue/drain, never across storage I/O

use crate::config::BufferConfig;
use event_store::Event;
use parking_lot::Mutex;
use std::collections::VecDeque;
use thiserror::Error;
use tokio::sync::Notify;

/// Enqueue refused because the buffer is at capacity
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("ingestion buffer full (capacity {capacity}), retry later")]
pub struct BufferFull {
    pub capacity: usize,
}

#[derive(Debug)]
pub struct IngestionBuffer {
    queue: Mutex<VecDeque<Event>>,
    capacity: usize,
    high_watermark: usize,
    watermark_signal: Notify,
}

impl IngestionBuffer {
    /// Create a buffer holding at most `capacity` events, with no watermark
    pub fn new(capacity: usize) -> Self {
        Self::with_watermark(capacity, 0)
    }

    /// Create a buffer that wakes the worker once depth reaches `high_watermark`.
    ///
    /// A watermark of 0 disables early wake-ups.
    pub fn with_watermark(capacity: usize, high_watermark: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
            capacity,
            high_watermark,
            watermark_signal: Notify::new(),
        }
    }

    pub fn from_config(config: &BufferConfig) -> Self {
        Self::with_watermark(config.capacity, config.effective_high_watermark())
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn high_watermark(&self) -> usize {
        self.high_watermark
    }

    /// Current depth
    #[inline]
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Append an event to the tail.
    ///
    /// Returns the depth after the append, or `BufferFull` without touching the
    /// buffer when it is at capacity.
    pub fn enqueue(&self, event: Event) -> Result<usize, BufferFull> {
        let depth = {
            let mut queue = self.queue.lock();
            if queue.len() >= self.capacity {
                return Err(BufferFull { capacity: self.capacity });
            }
            queue.push_back(event);
            queue.len()
        };

        if self.high_watermark > 0 && depth >= self.high_watermark {
            self.watermark_signal.notify_one();
        }

        Ok(depth)
    }

    /// Remove up to `max_n` events from the head, in FIFO order.
    ///
    /// An empty buffer yields an empty vector.
    pub fn drain(&self, max_n: usize) -> Vec<Event> {
        let mut queue = self.queue.lock();
        let n = max_n.min(queue.len());
        queue.drain(..n).collect()
    }

    /// Resolves once an enqueue has pushed depth to the high watermark.
    ///
    /// A signal raised while nobody was waiting is kept, so the next call
    /// returns immediately.
    pub async fn watermark_reached(&self) {
        self.watermark_signal.notified().await;
    }

    pub fn above_watermark(&self) -> bool {
        self.high_watermark > 0 && self.len() >= self.high_watermark
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn event(n: usize) -> Event {
        Event::new("s1", format!("e{n}"))
    }

    #[test]
    fn test_enqueue_and_drain_preserve_fifo_order() {
        let buffer = IngestionBuffer::new(100);
        for i in 0..10 {
            assert_eq!(buffer.enqueue(event(i)).unwrap(), i + 1);
        }

        let first = buffer.drain(4);
        let rest = buffer.drain(100);

        let order: Vec<String> =
            first.iter().chain(rest.iter()).map(|e| e.event_type.clone()).collect();
        let expected: Vec<String> = (0..10).map(|i| format!("e{i}")).collect();
        assert_eq!(order, expected);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_full_buffer_rejects_without_changing_contents() {
        let buffer = IngestionBuffer::new(2);
        buffer.enqueue(event(0)).unwrap();
        buffer.enqueue(event(1)).unwrap();

        let err = buffer.enqueue(event(2)).unwrap_err();
        assert_eq!(err, BufferFull { capacity: 2 });
        assert_eq!(buffer.len(), 2);

        let drained = buffer.drain(10);
        assert_eq!(drained, vec![event(0), event(1)]);
    }

    #[test]
    fn test_drain_bounded_by_max_and_depth() {
        let buffer = IngestionBuffer::new(10);
        for i in 0..5 {
            buffer.enqueue(event(i)).unwrap();
        }

        assert_eq!(buffer.drain(0).len(), 0);
        assert_eq!(buffer.drain(3).len(), 3);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.drain(50).len(), 2);
        assert!(buffer.drain(50).is_empty());
    }

    #[test]
    fn test_space_frees_after_drain() {
        let buffer = IngestionBuffer::new(1);
        buffer.enqueue(event(0)).unwrap();
        assert!(buffer.enqueue(event(1)).is_err());

        buffer.drain(1);
        assert!(buffer.enqueue(event(2)).is_ok());
    }

    #[test]
    fn test_concurrent_producers_never_exceed_capacity() {
        let buffer = Arc::new(IngestionBuffer::new(500));
        let handles: Vec<_> = (0..8)
            .map(|p| {
                let buffer = buffer.clone();
                std::thread::spawn(move || {
                    let mut accepted = 0;
                    for i in 0..100 {
                        if buffer.enqueue(Event::new(format!("p{p}"), format!("e{i}"))).is_ok() {
                            accepted += 1;
                        }
                    }
                    accepted
                })
            })
            .collect();

        let accepted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(accepted, 500);
        assert_eq!(buffer.len(), 500);

        // Each producer's events stay in its own submission order
        let drained = buffer.drain(1_000);
        for p in 0..8 {
            let site = format!("p{p}");
            let seq: Vec<usize> = drained
                .iter()
                .filter(|e| e.site_id == site)
                .map(|e| e.event_type[1..].parse().unwrap())
                .collect();
            assert!(seq.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[tokio::test]
    async fn test_watermark_wakes_waiter() {
        let buffer = Arc::new(IngestionBuffer::with_watermark(10, 3));
        buffer.enqueue(event(0)).unwrap();
        buffer.enqueue(event(1)).unwrap();
        assert!(!buffer.above_watermark());

        let waiter = {
            let buffer = buffer.clone();
            tokio::spawn(async move { buffer.watermark_reached().await })
        };

        buffer.enqueue(event(2)).unwrap();
        assert!(buffer.above_watermark());

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("watermark signal not delivered")
            .unwrap();
    }
}
