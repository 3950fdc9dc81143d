//! Configuration for periodic batching

use super::connection_status::BackoffPolicy;
use crate::core::error::{LoggerError, Result};
use std::time::Duration;

/// Options for [`PeriodicBatchingSink`](super::PeriodicBatchingSink)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodicBatchingOptions {
    /// Upper bound on the events sent in one delivery
    pub batch_size_limit: usize,
    /// Base interval between ticks while the endpoint is healthy
    pub period: Duration,
    /// Capacity of the event queue; `None` for unbounded
    pub queue_limit: Option<usize>,
    /// Deliver as soon as the first event arrives instead of waiting a period
    pub eagerly_emit_first_event: bool,
    pub backoff: BackoffPolicy,
    /// Keep a failed batch for the next tick until the drop-batch tier is reached
    pub retain_failed_batch: bool,
}

impl Default for PeriodicBatchingOptions {
    fn default() -> Self {
        Self {
            batch_size_limit: 1000,
            period: Duration::from_secs(2),
            queue_limit: Some(100_000),
            eagerly_emit_first_event: true,
            backoff: BackoffPolicy::default(),
            retain_failed_batch: false,
        }
    }
}

impl PeriodicBatchingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_batch_size_limit(mut self, limit: usize) -> Self {
        self.batch_size_limit = limit;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_queue_limit(mut self, limit: Option<usize>) -> Self {
        self.queue_limit = limit;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_eager_first_event(mut self, eager: bool) -> Self {
        self.eagerly_emit_first_event = eager;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_retain_failed_batch(mut self, retain: bool) -> Self {
        self.retain_failed_batch = retain;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size_limit == 0 {
            return Err(LoggerError::config(
                "PeriodicBatchingOptions",
                "batch size limit must be positive",
            ));
        }
        if self.period.is_zero() {
            return Err(LoggerError::config(
                "PeriodicBatchingOptions",
                "period must be positive",
            ));
        }
        if self.queue_limit == Some(0) {
            return Err(LoggerError::config(
                "PeriodicBatchingOptions",
                "queue limit must be positive",
            ));
        }
        if self.backoff.drop_queue_after < self.backoff.drop_batch_after {
            return Err(LoggerError::config(
                "PeriodicBatchingOptions",
                "the queue cannot be dropped before batches are",
            ));
        }
        Ok(())
    }
}
