//! Delivery metrics for observability
//!
//! Counters for monitoring a batching sink's health: accepted and dropped
//! events, delivery attempts and the events discarded by the backoff tiers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for a batching sink
///
/// # Example
///
/// ```
/// use rust_event_logger::SinkMetrics;
///
/// let metrics = SinkMetrics::new();
///
/// metrics.record_enqueued();
/// metrics.record_queue_full();
///
/// assert_eq!(metrics.events_enqueued(), 1);
/// assert_eq!(metrics.events_dropped(), 1);
/// ```
#[derive(Debug)]
pub struct SinkMetrics {
    /// Events accepted into the queue
    events_enqueued: AtomicU64,

    /// Events rejected because the queue was full
    events_dropped: AtomicU64,

    /// Events removed by the batched sink's inclusion filter
    events_filtered: AtomicU64,

    /// Events in batches that were delivered
    events_delivered: AtomicU64,

    /// Batches delivered successfully
    batches_delivered: AtomicU64,

    /// Delivery attempts that failed
    batches_failed: AtomicU64,

    /// Events discarded because of a failed batch or a backoff tier
    events_discarded: AtomicU64,
}

impl SinkMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            events_enqueued: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            events_filtered: AtomicU64::new(0),
            events_delivered: AtomicU64::new(0),
            batches_delivered: AtomicU64::new(0),
            batches_failed: AtomicU64::new(0),
            events_discarded: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn events_enqueued(&self) -> u64 {
        self.events_enqueued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn events_dropped(&self) -> u64 {
        self.events_dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn events_filtered(&self) -> u64 {
        self.events_filtered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn events_delivered(&self) -> u64 {
        self.events_delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn batches_delivered(&self) -> u64 {
        self.batches_delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn batches_failed(&self) -> u64 {
        self.batches_failed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn events_discarded(&self) -> u64 {
        self.events_discarded.load(Ordering::Relaxed)
    }

    /// Record an accepted event; returns the previous count
    #[inline]
    pub fn record_enqueued(&self) -> u64 {
        self.events_enqueued.fetch_add(1, Ordering::Relaxed)
    }

    /// Record an event rejected by a full queue; returns the previous count
    #[inline]
    pub fn record_queue_full(&self) -> u64 {
        self.events_dropped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_filtered(&self) -> u64 {
        self.events_filtered.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a delivered batch of `events` events
    #[inline]
    pub fn record_delivered(&self, events: usize) -> u64 {
        self.events_delivered
            .fetch_add(events as u64, Ordering::Relaxed);
        self.batches_delivered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_failed(&self) -> u64 {
        self.batches_failed.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_discarded(&self, events: usize) -> u64 {
        self.events_discarded
            .fetch_add(events as u64, Ordering::Relaxed)
    }

    /// Share of offered events lost to a full queue, as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing has been offered.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.events_dropped() as f64;
        let total = self.events_enqueued() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.events_enqueued.store(0, Ordering::Relaxed);
        self.events_dropped.store(0, Ordering::Relaxed);
        self.events_filtered.store(0, Ordering::Relaxed);
        self.events_delivered.store(0, Ordering::Relaxed);
        self.batches_delivered.store(0, Ordering::Relaxed);
        self.batches_failed.store(0, Ordering::Relaxed);
        self.events_discarded.store(0, Ordering::Relaxed);
    }
}

impl Default for SinkMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SinkMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            events_enqueued: AtomicU64::new(self.events_enqueued()),
            events_dropped: AtomicU64::new(self.events_dropped()),
            events_filtered: AtomicU64::new(self.events_filtered()),
            events_delivered: AtomicU64::new(self.events_delivered()),
            batches_delivered: AtomicU64::new(self.batches_delivered()),
            batches_failed: AtomicU64::new(self.batches_failed()),
            events_discarded: AtomicU64::new(self.events_discarded()),
        }
    }
}
