//! Delivery pipeline: bounded buffering, periodic batching and ingestion

pub mod batched;
pub mod bounded_queue;
pub mod connection_status;
pub mod ingestion;
pub mod options;
pub mod periodic_batching;

pub use batched::{AsyncIngestionClient, BatchedSink, IngestionClient};
#[cfg(feature = "async-clients")]
pub use batched::BlockingIngestionClient;
pub use bounded_queue::BoundedQueue;
pub use connection_status::{BackoffPolicy, ConnectionStatus};
pub use ingestion::{IngestionSink, DEFAULT_LEVEL_CHECK_INTERVAL};
pub use options::PeriodicBatchingOptions;
pub use periodic_batching::PeriodicBatchingSink;
