//! Batch delivery traits
//!
//! [`BatchedSink`] is what [`PeriodicBatchingSink`](super::PeriodicBatchingSink)
//! drives from its worker thread. [`IngestionClient`] is the transport seam
//! below it: an opaque `deliver(batch)` capability plus an optional
//! server-side level hint.

use crate::core::error::Result;
use crate::core::event::LogEvent;
use crate::core::level::Level;
use async_trait::async_trait;

/// Receives batches from the batching worker.
///
/// Only the worker thread calls these methods, one at a time.
pub trait BatchedSink: Send {
    /// Deliver a whole batch; an `Err` counts as one failure for backoff
    fn emit_batch(&mut self, batch: &[LogEvent]) -> Result<()>;

    /// Called on a tick that found nothing to send; an `Err` counts as a failure
    fn on_empty_batch(&mut self) -> Result<()> {
        Ok(())
    }

    /// Events rejected here are dropped before batching
    fn can_include(&self, _event: &LogEvent) -> bool {
        true
    }

    /// Release resources; called once after the final flush
    fn close(&mut self) {}

    fn name(&self) -> &str {
        "batched"
    }
}

/// Delivers batches to an ingestion endpoint
///
/// # Example
///
/// ```
/// use rust_event_logger::core::{LogEvent, Result};
/// use rust_event_logger::sinks::IngestionClient;
///
/// struct Discard;
///
/// impl IngestionClient for Discard {
///     fn deliver(&mut self, _batch: &[LogEvent]) -> Result<()> {
///         Ok(())
///     }
///
///     fn name(&self) -> &str {
///         "discard"
///     }
/// }
/// ```
pub trait IngestionClient: Send {
    /// Send `batch`; an empty batch is a keep-alive that lets the server
    /// report its level
    fn deliver(&mut self, batch: &[LogEvent]) -> Result<()>;

    /// The minimum level most recently requested by the server, if any
    fn poll_server_level(&mut self) -> Option<Level> {
        None
    }

    fn close(&mut self) {}

    fn name(&self) -> &str {
        "ingestion"
    }
}

impl<F> IngestionClient for F
where
    F: FnMut(&[LogEvent]) -> Result<()> + Send,
{
    fn deliver(&mut self, batch: &[LogEvent]) -> Result<()> {
        self(batch)
    }
}

/// Async flavour of [`IngestionClient`] for transports built on `tokio`
///
/// # Example
///
/// ```no_run
/// use rust_event_logger::core::{LogEvent, Result};
/// use rust_event_logger::sinks::AsyncIngestionClient;
/// use async_trait::async_trait;
///
/// struct HttpClient;
///
/// #[async_trait]
/// impl AsyncIngestionClient for HttpClient {
///     async fn deliver(&mut self, batch: &[LogEvent]) -> Result<()> {
///         // POST the batch
///         Ok(())
///     }
///
///     fn name(&self) -> &str {
///         "http"
///     }
/// }
/// ```
#[async_trait]
pub trait AsyncIngestionClient: Send {
    async fn deliver(&mut self, batch: &[LogEvent]) -> Result<()>;

    async fn poll_server_level(&mut self) -> Option<Level> {
        None
    }

    async fn close(&mut self) {}

    fn name(&self) -> &str;
}

/// Runs an [`AsyncIngestionClient`] on its own current-thread runtime.
///
/// The runtime lives on the batching worker, so async transports can be used
/// without the application running an executor.
#[cfg(feature = "async-clients")]
pub struct BlockingIngestionClient<C> {
    client: C,
    runtime: tokio::runtime::Runtime,
}

#[cfg(feature = "async-clients")]
impl<C: AsyncIngestionClient> BlockingIngestionClient<C> {
    pub fn new(client: C) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(crate::core::error::LoggerError::WorkerSpawn)?;
        Ok(Self { client, runtime })
    }
}

#[cfg(feature = "async-clients")]
impl<C: AsyncIngestionClient> IngestionClient for BlockingIngestionClient<C> {
    fn deliver(&mut self, batch: &[LogEvent]) -> Result<()> {
        self.runtime.block_on(self.client.deliver(batch))
    }

    fn poll_server_level(&mut self) -> Option<Level> {
        self.runtime.block_on(self.client.poll_server_level())
    }

    fn close(&mut self) {
        self.runtime.block_on(self.client.close())
    }

    fn name(&self) -> &str {
        self.client.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::LoggerError;

    struct RecordingClient {
        delivered: Vec<usize>,
        level: Option<Level>,
        closed: bool,
    }

    #[async_trait]
    impl AsyncIngestionClient for RecordingClient {
        async fn deliver(&mut self, batch: &[LogEvent]) -> Result<()> {
            if batch.len() > 2 {
                return Err(LoggerError::delivery("recording", "batch too large"));
            }
            self.delivered.push(batch.len());
            Ok(())
        }

        async fn poll_server_level(&mut self) -> Option<Level> {
            self.level
        }

        async fn close(&mut self) {
            self.closed = true;
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    #[test]
    fn test_closure_is_an_ingestion_client() {
        let mut calls = 0;
        let mut client = |batch: &[LogEvent]| -> Result<()> {
            calls += batch.len() + 1;
            Ok(())
        };
        assert!(IngestionClient::deliver(&mut client, &[]).is_ok());
        assert_eq!(IngestionClient::poll_server_level(&mut client), None);
        assert_eq!(IngestionClient::name(&client), "ingestion");
        drop(client);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_async_client_defaults_and_errors() {
        let mut client = RecordingClient {
            delivered: Vec::new(),
            level: Some(Level::Warning),
            closed: false,
        };

        tokio_test::block_on(async {
            assert!(client.deliver(&[]).await.is_ok());
            assert_eq!(client.poll_server_level().await, Some(Level::Warning));
            client.close().await;
        });

        assert_eq!(client.delivered, vec![0]);
        assert!(client.closed);
    }

    #[cfg(feature = "async-clients")]
    #[test]
    fn test_blocking_adapter_drives_async_client() {
        let client = RecordingClient {
            delivered: Vec::new(),
            level: Some(Level::Error),
            closed: false,
        };
        let mut blocking = BlockingIngestionClient::new(client).unwrap();

        assert!(blocking.deliver(&[]).is_ok());
        assert_eq!(blocking.poll_server_level(), Some(Level::Error));
        assert_eq!(blocking.name(), "recording");
        blocking.close();
        assert!(blocking.client.closed);
    }
}
