//! Sink trait for event destinations

use super::event::LogEvent;
use super::self_log::panic_message;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Terminal destination of a logging pipeline.
///
/// `emit` is called concurrently from application threads and must not block
/// on I/O or panic.
pub trait Sink: Send + Sync {
    fn emit(&self, event: LogEvent);

    /// Release resources, flushing anything buffered. Must be idempotent.
    fn dispose(&self) {}

    fn name(&self) -> &str {
        "sink"
    }
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn emit(&self, event: LogEvent) {
        (**self).emit(event)
    }

    fn dispose(&self) {
        (**self).dispose()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn emit(&self, event: LogEvent) {
        (**self).emit(event)
    }

    fn dispose(&self) {
        (**self).dispose()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Fans events out to several sinks.
///
/// **Per-Sink Panic Isolation**: each sink call is wrapped in `catch_unwind`,
/// so one failing sink does not keep events from the others.
pub struct SafeAggregateSink {
    sinks: Vec<Box<dyn Sink>>,
}

impl SafeAggregateSink {
    pub fn new(sinks: Vec<Box<dyn Sink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Sink for SafeAggregateSink {
    fn emit(&self, event: LogEvent) {
        let Some((last, rest)) = self.sinks.split_last() else {
            return;
        };
        for (idx, sink) in rest.iter().enumerate() {
            let copy = event.clone();
            isolate(idx, sink.as_ref(), "emit", || sink.emit(copy));
        }
        isolate(rest.len(), last.as_ref(), "emit", || last.emit(event));
    }

    fn dispose(&self) {
        for (idx, sink) in self.sinks.iter().enumerate() {
            isolate(idx, sink.as_ref(), "dispose", || sink.dispose());
        }
    }

    fn name(&self) -> &str {
        "SafeAggregateSink"
    }
}

fn isolate<F: FnOnce()>(idx: usize, sink: &dyn Sink, operation: &str, f: F) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        crate::self_log!(
            "Sink #{} '{}' panicked during {}: {}. Other sinks continue to function.",
            idx,
            sink.name(),
            operation,
            panic_message(payload.as_ref())
        );
    }
}
