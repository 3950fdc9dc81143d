//! Core event model, capture and dispatch

pub mod capture;
pub mod controlled_switch;
pub mod enricher;
pub mod error;
pub mod event;
pub mod level;
pub mod level_switch;
pub mod logger;
pub mod metrics;
pub mod override_map;
pub mod scope;
pub mod self_log;
pub mod settings;
pub mod sink;
pub mod template;
pub mod tracing_context;
pub mod value;

pub use capture::{Arg, Destructure, PropertyFactory, DEFAULT_MAXIMUM_DESTRUCTURING_DEPTH};
pub use controlled_switch::ControlledLevelSwitch;
pub use enricher::{Enricher, ExceptionDataEnricher, FixedPropertyEnricher, SafeAggregateEnricher};
pub use error::{LoggerError, Result};
pub use event::{EventError, EventId, LogEvent};
pub use level::Level;
pub use level_switch::LevelSwitch;
pub use logger::{LogCall, Logger, LoggerBuilder, SOURCE_CONTEXT_PROPERTY_NAME};
pub use metrics::SinkMetrics;
pub use override_map::LevelOverrideMap;
pub use scope::{ScopeEnricher, ScopeGuard, ScopeStack, SCOPE_PROPERTY_NAME};
pub use settings::LoggerSettings;
pub use sink::{SafeAggregateSink, Sink};
pub use template::{Alignment, Destructuring, MessageTemplate, PropertyToken, TemplateCache, Token};
pub use tracing_context::{SpanId, TraceContext, TraceId};
pub use value::{LogEventProperty, PropertyValue, Scalar};
