//! # Rust Event Logger
//!
//! Structured event logging with message templates, dynamic level control and
//! adaptive periodic batch delivery to an ingestion endpoint.
//!
//! ## Features
//!
//! - **Message Templates**: `"User {UserId} logged in"` captures `UserId` as a
//!   property and renders the message on demand
//! - **Dynamic Levels**: shared level switches, per-source overrides and
//!   levels pushed by the ingestion server
//! - **Enrichment**: fixed properties, exception data and ambient scopes
//! - **Batched Delivery**: a bounded queue drained by one worker thread with
//!   exponential backoff while the endpoint is unavailable
//! - **Never Panics Into Callers**: faults are reported through [`self_log`]
//!
//! ## Example
//!
//! ```
//! use rust_event_logger::prelude::*;
//! use rust_event_logger::sinks::{IngestionSink, PeriodicBatchingOptions, PeriodicBatchingSink};
//! use std::sync::Arc;
//!
//! let switch = Arc::new(LevelSwitch::new(Level::Information));
//! let client = |batch: &[LogEvent]| -> Result<()> {
//!     // hand the batch to a transport
//!     let _ = batch.len();
//!     Ok(())
//! };
//! let ingestion = IngestionSink::new(client, Some(Arc::clone(&switch)));
//! let sink = PeriodicBatchingSink::new(Box::new(ingestion), PeriodicBatchingOptions::default())?;
//!
//! let logger = Logger::builder().level_switch(switch).sink(sink).build()?;
//! logger.info("Hello, {Name}!", &[Arg::from("World")]);
//! logger.dispose();
//! # Ok::<(), LoggerError>(())
//! ```
//!
//! [`self_log`]: crate::core::self_log

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        Arg, Destructuring, Enricher, EventError, EventId, Level, LevelSwitch, LogCall, LogEvent,
        LogEventProperty, Logger, LoggerBuilder, LoggerError, LoggerSettings, PropertyValue,
        Result, Scalar, ScopeStack, Sink, SinkMetrics,
    };
}

pub use crate::core::{
    Arg, ControlledLevelSwitch, Destructuring, Enricher, EventError, EventId, Level,
    LevelOverrideMap, LevelSwitch, LogCall, LogEvent, LogEventProperty, Logger, LoggerBuilder,
    LoggerError, LoggerSettings, MessageTemplate, PropertyFactory, PropertyValue, Result, Scalar,
    ScopeGuard, ScopeStack, Sink, SinkMetrics, SpanId, TraceContext, TraceId,
};
pub use crate::sinks::{
    BatchedSink, IngestionClient, IngestionSink, PeriodicBatchingOptions, PeriodicBatchingSink,
};
