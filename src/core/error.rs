//! Error types for the logging pipeline
//!
//! Only construction-time APIs return these errors. Everything reachable from
//! a log call recovers locally and reports through [`crate::core::self_log`].

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Property name rejected by the naming rules
    #[error("Invalid property name `{0}`")]
    InvalidPropertyName(String),

    /// A batch could not be delivered to the ingestion endpoint
    #[error("Delivery through '{sink}' failed: {message}")]
    Delivery { sink: String, message: String },

    /// The background worker thread could not be started
    #[error("Failed to spawn batching worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The sink or logger has already been disposed
    #[error("Sink already disposed")]
    Disposed,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a delivery error for the named sink
    pub fn delivery(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::Delivery {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}
