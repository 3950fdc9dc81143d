//! Diagnostic side-channel for faults inside the pipeline itself
//!
//! Bad templates, panicking enrichers, failed deliveries and invalid settings
//! are reported here instead of being raised to the caller. Output is disabled
//! by default; when disabled a write costs a single atomic load.
//!
//! # Example
//!
//! ```
//! use rust_event_logger::core::self_log;
//! use std::sync::{Arc, Mutex};
//!
//! let lines = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&lines);
//! self_log::enable(move |line| sink.lock().unwrap().push(line.to_string()));
//!
//! self_log::write(format_args!("queue limit {} reached", 100));
//! self_log::disable();
//!
//! assert!(lines.lock().unwrap()[0].ends_with("queue limit 100 reached"));
//! ```

use parking_lot::RwLock;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Output = Arc<dyn Fn(&str) + Send + Sync>;

static ENABLED: AtomicBool = AtomicBool::new(false);
static OUTPUT: RwLock<Option<Output>> = parking_lot::const_rwlock(None);

/// Route diagnostic lines to `output`
pub fn enable<F>(output: F)
where
    F: Fn(&str) + Send + Sync + 'static,
{
    *OUTPUT.write() = Some(Arc::new(output));
    ENABLED.store(true, Ordering::Release);
}

/// Route diagnostic lines to stderr
pub fn enable_stderr() {
    enable(|line| eprintln!("[LOGGER SELFLOG] {}", line));
}

pub fn disable() {
    ENABLED.store(false, Ordering::Release);
    *OUTPUT.write() = None;
}

#[inline]
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Acquire)
}

/// Write one diagnostic line, prefixed with an RFC 3339 timestamp.
///
/// Never panics and never blocks on anything but the output callback.
pub fn write(args: fmt::Arguments<'_>) {
    if !is_enabled() {
        return;
    }

    let output = match OUTPUT.read().as_ref() {
        Some(output) => Arc::clone(output),
        None => return,
    };

    let line = format!(
        "{} {}",
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
        args
    );

    let _ = panic::catch_unwind(AssertUnwindSafe(|| output(&line)));
}

/// Format and write a diagnostic line
#[macro_export]
#[doc(hidden)]
macro_rules! self_log {
    ($($arg:tt)+) => {
        if $crate::core::self_log::is_enabled() {
            $crate::core::self_log::write(format_args!($($arg)+));
        }
    };
}

/// Extract a readable message from a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
