//! Logging macros for ergonomic log calls.
//!
//! Each macro takes a logger, a message template and positional arguments.
//! Arguments are converted with `Arg::from`, so scalars and strings can be
//! passed directly and anything else through [`Arg::display`] or
//! [`Arg::structured`].
//!
//! # Examples
//!
//! ```
//! use rust_event_logger::prelude::*;
//! use rust_event_logger::info;
//!
//! let logger = Logger::builder().build().unwrap();
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With template properties
//! let port = 8080;
//! info!(logger, "Server listening on port {Port}", port);
//!
//! // Several properties
//! let user_id = 42;
//! info!(logger, "User {UserId} performed {Action}", user_id, "login");
//! ```
//!
//! [`Arg::display`]: crate::core::Arg::display
//! [`Arg::structured`]: crate::core::Arg::structured

/// Log at an explicit level.
///
/// # Examples
///
/// ```
/// # use rust_event_logger::prelude::*;
/// # let logger = Logger::builder().build().unwrap();
/// use rust_event_logger::log;
/// log!(logger, Level::Information, "Simple message");
/// log!(logger, Level::Error, "Error code: {Code}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $template:expr $(,)?) => {
        $logger.log($level, $template, &[])
    };
    ($logger:expr, $level:expr, $template:expr, $($arg:expr),+ $(,)?) => {
        $logger.log($level, $template, &[$($crate::core::Arg::from($arg)),+])
    };
}

/// Log a trace-level message.
///
/// # Examples
///
/// ```
/// # use rust_event_logger::prelude::*;
/// # let logger = Logger::builder().minimum_level(Level::Trace).build().unwrap();
/// use rust_event_logger::trace;
/// trace!(logger, "Entering {Function}", "calculate");
/// ```
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::Level::Trace, $($arg)+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::Level::Debug, $($arg)+)
    };
}

/// Log an information-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::Level::Information, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # use rust_event_logger::prelude::*;
/// # let logger = Logger::builder().build().unwrap();
/// use rust_event_logger::warn;
/// warn!(logger, "Retry attempt {Attempt} of {Max}", 3, 5);
/// ```
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::Level::Warning, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::Level::Error, $($arg)+)
    };
}

/// Log a critical-level message.
#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::Level::Critical, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::sink::testing::CollectingSink;
    use crate::core::{Arg, Level, Logger};
    use std::sync::Arc;

    fn collecting() -> (Logger, Arc<CollectingSink>) {
        let sink = Arc::new(CollectingSink::default());
        let logger = Logger::builder()
            .minimum_level(Level::Trace)
            .sink(Arc::clone(&sink))
            .build()
            .unwrap();
        (logger, sink)
    }

    #[test]
    fn test_log_macro() {
        let (logger, sink) = collecting();
        log!(logger, Level::Information, "Test message");
        log!(logger, Level::Warning, "Formatted: {Value}", 42);
        assert_eq!(sink.messages(), vec!["Test message", "Formatted: 42"]);
        assert_eq!(sink.events.lock()[1].level(), Level::Warning);
    }

    #[test]
    fn test_level_macros() {
        let (logger, sink) = collecting();
        trace!(logger, "t");
        debug!(logger, "d {N}", 1);
        info!(logger, "i");
        warn!(logger, "w {A} {B}", 1, 3);
        error!(logger, "e {Code}", 500);
        critical!(logger, "c {What}", "system");

        let levels: Vec<Level> = sink.events.lock().iter().map(|e| e.level()).collect();
        assert_eq!(levels, Level::ALL.to_vec());
        assert_eq!(sink.messages()[3], "w 1 3");
    }

    #[test]
    fn test_macro_accepts_explicit_args() {
        #[derive(serde::Serialize)]
        struct Point {
            x: i32,
            y: i32,
        }

        let (logger, sink) = collecting();
        let point = Point { x: 1, y: 2 };
        info!(logger, "At {@Point}", Arg::structured(&point));

        let events = sink.events.lock();
        assert_eq!(
            events[0].property("Point").unwrap().to_string(),
            "Point { x: 1, y: 2 }"
        );
    }

    #[test]
    fn test_disabled_level_is_skipped() {
        let sink = Arc::new(CollectingSink::default());
        let logger = Logger::builder().sink(Arc::clone(&sink)).build().unwrap();
        debug!(logger, "hidden {N}", 1);
        assert!(sink.events.lock().is_empty());
    }
}
