//! Queue-and-timer front end for a [`BatchedSink`]

use super::batched::BatchedSink;
use super::bounded_queue::BoundedQueue;
use super::connection_status::ConnectionStatus;
use super::options::PeriodicBatchingOptions;
use crate::core::error::{LoggerError, Result};
use crate::core::event::LogEvent;
use crate::core::metrics::SinkMetrics;
use crate::core::self_log::panic_message;
use crate::core::sink::Sink;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// How often a full queue is reported to the self-log
const QUEUE_FULL_REPORT_EVERY: u64 = 1000;

enum Command {
    /// Schedule the first tick after the given delay
    Arm(Duration),
    Stop,
}

struct Shared {
    queue: BoundedQueue<LogEvent>,
    metrics: SinkMetrics,
    unloading: AtomicBool,
    started: AtomicBool,
}

/// Buffers events from any thread and hands them to a [`BatchedSink`] in
/// batches from a single worker thread.
///
/// The worker ticks every `period` while deliveries succeed and backs off
/// exponentially while they fail. After `drop_batch_after` consecutive
/// failures each tick discards its batch, after `drop_queue_after` it also
/// discards the queue, so memory stays bounded while the endpoint is down.
///
/// Disposal (explicit or on drop) delivers whatever is queued exactly once,
/// closes the batched sink and joins the worker.
pub struct PeriodicBatchingSink {
    shared: Arc<Shared>,
    commands: Sender<Command>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    first_delay: Duration,
    name: String,
}

impl PeriodicBatchingSink {
    pub fn new(inner: Box<dyn BatchedSink>, options: PeriodicBatchingOptions) -> Result<Self> {
        options.validate()?;

        let shared = Arc::new(Shared {
            queue: BoundedQueue::new(options.queue_limit)?,
            metrics: SinkMetrics::new(),
            unloading: AtomicBool::new(false),
            started: AtomicBool::new(false),
        });
        let name = inner.name().to_string();
        let (commands, receiver) = unbounded();

        let worker = Worker {
            status: ConnectionStatus::new(options.period, options.backoff),
            waiting: Vec::with_capacity(options.batch_size_limit),
            batch_size_limit: options.batch_size_limit,
            retain_failed_batch: options.retain_failed_batch,
            shared: Arc::clone(&shared),
            name: name.clone(),
            inner,
        };

        let handle = thread::Builder::new()
            .name(format!("periodic-batching-{}", name))
            .spawn(move || worker.run(receiver))
            .map_err(LoggerError::WorkerSpawn)?;

        let first_delay = if options.eagerly_emit_first_event {
            Duration::ZERO
        } else {
            options.period
        };

        Ok(Self {
            shared,
            commands,
            worker: Mutex::new(Some(handle)),
            first_delay,
            name,
        })
    }

    pub fn metrics(&self) -> &SinkMetrics {
        &self.shared.metrics
    }

    /// Events waiting for the next tick
    pub fn queued(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.unloading.load(Ordering::Acquire)
    }

    fn enqueue(&self, event: LogEvent) {
        if self.shared.unloading.load(Ordering::Acquire) {
            return;
        }

        if !self.shared.queue.try_enqueue(event) {
            let dropped = self.shared.metrics.record_queue_full();
            if dropped % QUEUE_FULL_REPORT_EVERY == 0 {
                crate::self_log!(
                    "Queue limit of {} reached in '{}'; dropping events ({} dropped so far)",
                    self.shared.queue.limit().unwrap_or_default(),
                    self.name,
                    dropped + 1
                );
            }
            return;
        }

        self.shared.metrics.record_enqueued();
        if !self.shared.started.swap(true, Ordering::AcqRel) {
            let _ = self.commands.send(Command::Arm(self.first_delay));
        }
    }

    fn shutdown(&self) {
        if self.shared.unloading.swap(true, Ordering::AcqRel) {
            return;
        }

        let _ = self.commands.send(Command::Stop);
        if let Some(handle) = self.worker.lock().take() {
            if let Err(e) = handle.join() {
                crate::self_log!(
                    "Batching worker for '{}' panicked during shutdown: {}",
                    self.name,
                    panic_message(e.as_ref())
                );
            }
        }
    }
}

impl Sink for PeriodicBatchingSink {
    fn emit(&self, event: LogEvent) {
        self.enqueue(event);
    }

    fn dispose(&self) {
        self.shutdown();
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for PeriodicBatchingSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// State owned by the worker thread; nothing here is shared
struct Worker {
    inner: Box<dyn BatchedSink>,
    shared: Arc<Shared>,
    status: ConnectionStatus,
    waiting: Vec<LogEvent>,
    batch_size_limit: usize,
    retain_failed_batch: bool,
    name: String,
}

impl Worker {
    fn run(mut self, commands: Receiver<Command>) {
        let mut deadline: Option<Instant> = None;

        loop {
            let received = match deadline {
                Some(at) => commands.recv_deadline(at),
                None => commands
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(Command::Arm(delay)) => deadline = Some(Instant::now() + delay),
                Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    self.tick();
                    deadline = Some(Instant::now() + self.status.next_interval());
                }
            }
        }

        // Final flush; the unloading flag is already set
        self.tick();

        let inner = &mut self.inner;
        if let Err(e) = panic::catch_unwind(AssertUnwindSafe(|| inner.close())) {
            crate::self_log!(
                "Batched sink '{}' panicked during close: {}",
                self.name,
                panic_message(e.as_ref())
            );
        }
    }

    fn tick(&mut self) {
        loop {
            self.fill();

            if self.waiting.is_empty() {
                if !self.shared.unloading.load(Ordering::Acquire) {
                    if let Err(message) = self.run_empty_batch_hook() {
                        crate::self_log!(
                            "Exception while running the empty batch hook of '{}': {}",
                            self.name,
                            message
                        );
                        self.status.mark_failure();
                    }
                }
                break;
            }

            let batch_len = self.waiting.len();
            match self.deliver() {
                Ok(()) => {
                    self.shared.metrics.record_delivered(batch_len);
                    self.status.mark_success();
                    self.waiting.clear();
                    if batch_len < self.batch_size_limit {
                        break;
                    }
                }
                Err(message) => {
                    crate::self_log!(
                        "Exception while emitting periodic batch from '{}': {}",
                        self.name,
                        message
                    );
                    self.shared.metrics.record_failed();
                    self.status.mark_failure();
                    if !self.retain_failed_batch {
                        self.shared.metrics.record_discarded(batch_len);
                        self.waiting.clear();
                    }
                    break;
                }
            }
        }

        if self.status.should_drop_batch() && !self.waiting.is_empty() {
            crate::self_log!(
                "Dropping the current batch of {} events from '{}' after {} consecutive failures",
                self.waiting.len(),
                self.name,
                self.status.failures_since_success()
            );
            self.shared.metrics.record_discarded(self.waiting.len());
            self.waiting.clear();
        }

        if self.status.should_drop_queue() {
            let drained = self.shared.queue.drain();
            if drained > 0 {
                crate::self_log!(
                    "Dropping {} queued events from '{}' after {} consecutive failures",
                    drained,
                    self.name,
                    self.status.failures_since_success()
                );
                self.shared.metrics.record_discarded(drained);
            }
        }
    }

    fn fill(&mut self) {
        while self.waiting.len() < self.batch_size_limit {
            let Some(event) = self.shared.queue.try_dequeue() else {
                break;
            };
            if self.inner.can_include(&event) {
                self.waiting.push(event);
            } else {
                self.shared.metrics.record_filtered();
            }
        }
    }

    fn deliver(&mut self) -> std::result::Result<(), String> {
        let inner = &mut self.inner;
        let batch = &self.waiting;
        match panic::catch_unwind(AssertUnwindSafe(|| inner.emit_batch(batch))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
        }
    }

    fn run_empty_batch_hook(&mut self) -> std::result::Result<(), String> {
        let inner = &mut self.inner;
        match panic::catch_unwind(AssertUnwindSafe(|| inner.on_empty_batch())) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
        }
    }
}
