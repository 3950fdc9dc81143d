//! Scoped properties carried along one logical call chain
//!
//! A [`ScopeStack`] is passed explicitly (or cloned into closures and tasks)
//! instead of living in thread-local storage, so a scope survives `.await`
//! points and thread hops. Each push returns a [`ScopeGuard`] that restores
//! the stack to the exact state captured at push time when dropped.
//!
//! # Example
//!
//! ```
//! use rust_event_logger::core::scope::ScopeStack;
//! use rust_event_logger::Arg;
//!
//! let scopes = ScopeStack::new();
//! {
//!     let _request = scopes.push_property("RequestId", &Arg::from("r-17"), false);
//!     assert_eq!(scopes.depth(), 1);
//! }
//! assert_eq!(scopes.depth(), 0);
//! ```

use super::capture::{Arg, Destructuring, PropertyFactory};
use super::enricher::Enricher;
use super::event::LogEvent;
use super::template::MessageTemplate;
use super::tracing_context::TraceContext;
use super::value::{LogEventProperty, PropertyValue};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Name of the sequence property holding unnamed scope items
pub const SCOPE_PROPERTY_NAME: &str = "Scope";

#[derive(Debug, Default)]
struct Frame {
    properties: Vec<LogEventProperty>,
    item: Option<PropertyValue>,
    trace: Option<TraceContext>,
    parent: Option<Arc<Frame>>,
}

type Snapshot = Option<Arc<Frame>>;

/// A persistent stack of scope frames for one logical call chain
#[derive(Clone, Default)]
pub struct ScopeStack {
    current: Arc<Mutex<Snapshot>>,
    factory: Arc<PropertyFactory>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture scope values under the given limits
    pub fn with_factory(factory: PropertyFactory) -> Self {
        Self {
            current: Arc::default(),
            factory: Arc::new(factory),
        }
    }

    /// An independent chain that starts from the current scopes
    #[must_use]
    pub fn fork(&self) -> Self {
        Self {
            current: Arc::new(Mutex::new(self.snapshot())),
            factory: Arc::clone(&self.factory),
        }
    }

    /// Number of active frames
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut frame = self.snapshot();
        while let Some(f) = frame {
            depth += 1;
            frame = f.parent.clone();
        }
        depth
    }

    pub fn is_empty(&self) -> bool {
        self.current.lock().is_none()
    }

    /// Push a single named property
    pub fn push_property(&self, name: &str, value: &Arg<'_>, destructure: bool) -> ScopeGuard {
        match self.factory.bind_property(name, value, destructure) {
            Some(property) => self.push(vec![property], None, None),
            None => self.guard(),
        }
    }

    /// Push a bag of properties; a key starting with `@` is destructured
    pub fn push_properties<'a, I, K>(&self, properties: I) -> ScopeGuard
    where
        I: IntoIterator<Item = (K, Arg<'a>)>,
        K: AsRef<str>,
    {
        let bound = properties
            .into_iter()
            .filter_map(|(key, value)| {
                let key = key.as_ref();
                match key.strip_prefix('@') {
                    Some(name) => self.factory.bind_property(name, &value, true),
                    None => self.factory.bind_property(key, &value, false),
                }
            })
            .collect();
        self.push(bound, None, None)
    }

    /// Push the properties of a bound template; its rendered text becomes a scope item
    pub fn push_template(&self, template: &str, args: &[Arg<'_>]) -> ScopeGuard {
        let template = Arc::new(MessageTemplate::parse(template));
        let (template, properties) = self.factory.bind_template(template, args);
        let message = template.render(|name| {
            properties
                .iter()
                .rev()
                .find(|p| p.name == name)
                .map(|p| &p.value)
        });
        self.push(properties, Some(PropertyValue::from(message)), None)
    }

    /// Push an unnamed value recorded in the `Scope` sequence
    pub fn push_scope(&self, value: &Arg<'_>) -> ScopeGuard {
        let item = self.factory.create_value(value, Destructuring::Default);
        self.push(Vec::new(), Some(item), None)
    }

    /// Push a trace position applied to events that carry none
    pub fn push_trace(&self, trace: TraceContext) -> ScopeGuard {
        self.push(Vec::new(), None, Some(trace))
    }

    fn push(
        &self,
        properties: Vec<LogEventProperty>,
        item: Option<PropertyValue>,
        trace: Option<TraceContext>,
    ) -> ScopeGuard {
        let mut current = self.current.lock();
        let restore = current.clone();
        *current = Some(Arc::new(Frame {
            properties,
            item,
            trace,
            parent: restore.clone(),
        }));
        ScopeGuard {
            current: Arc::clone(&self.current),
            restore: Some(restore),
        }
    }

    fn guard(&self) -> ScopeGuard {
        ScopeGuard {
            current: Arc::clone(&self.current),
            restore: Some(self.snapshot()),
        }
    }

    fn snapshot(&self) -> Snapshot {
        self.current.lock().clone()
    }

    /// Apply the active scopes to `event`
    pub fn enrich(&self, event: &mut LogEvent) {
        let snapshot = self.snapshot();

        // Innermost first
        let mut frames = Vec::new();
        let mut frame = snapshot.as_deref();
        while let Some(f) = frame {
            frames.push(f);
            frame = f.parent.as_deref();
        }

        if event.trace_id().is_none() {
            if let Some(trace) = frames.iter().find_map(|f| f.trace) {
                event.set_trace(trace.trace_id, trace.span_id);
            }
        }

        let mut items = Vec::new();
        for f in frames.iter().rev() {
            for property in &f.properties {
                event.add_or_update_property(property.clone());
            }
            if let Some(item) = &f.item {
                items.push(item.clone());
            }
        }

        if !items.is_empty() {
            event.add_property_if_absent(LogEventProperty::new(
                SCOPE_PROPERTY_NAME,
                PropertyValue::Sequence(items),
            ));
        }
    }
}

impl fmt::Debug for ScopeStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeStack")
            .field("depth", &self.depth())
            .finish()
    }
}

/// Restores the scope stack to its push-time state when dropped
#[must_use = "the scope ends as soon as the guard is dropped"]
pub struct ScopeGuard {
    current: Arc<Mutex<Snapshot>>,
    restore: Option<Snapshot>,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if let Some(restore) = self.restore.take() {
            *self.current.lock() = restore;
        }
    }
}

impl fmt::Debug for ScopeGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeGuard").finish_non_exhaustive()
    }
}

/// Enricher applying a [`ScopeStack`] to every event
#[derive(Debug, Clone)]
pub struct ScopeEnricher {
    scopes: ScopeStack,
}

impl ScopeEnricher {
    pub fn new(scopes: ScopeStack) -> Self {
        Self { scopes }
    }
}

impl Enricher for ScopeEnricher {
    fn enrich(&self, event: &mut LogEvent, _factory: &PropertyFactory) {
        self.scopes.enrich(event);
    }

    fn name(&self) -> &str {
        "ScopeEnricher"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::level::Level;
    use crate::core::tracing_context::{SpanId, TraceId};
    use chrono::Utc;

    fn event() -> LogEvent {
        LogEvent::new(
            Utc::now(),
            Level::Information,
            None,
            Arc::new(MessageTemplate::parse("test")),
            Vec::new(),
        )
    }

    fn enriched(scopes: &ScopeStack) -> LogEvent {
        let mut e = event();
        scopes.enrich(&mut e);
        e
    }

    #[test]
    fn test_innermost_property_wins() {
        let scopes = ScopeStack::new();
        let _outer = scopes.push_property("User", &Arg::from("outer"), false);
        let _inner = scopes.push_property("User", &Arg::from("inner"), false);

        let e = enriched(&scopes);
        assert_eq!(e.property("User").and_then(PropertyValue::as_str), Some("inner"));
    }

    #[test]
    fn test_scope_items_outer_to_inner() {
        let scopes = ScopeStack::new();
        let _a = scopes.push_scope(&Arg::from("first"));
        let _b = scopes.push_scope(&Arg::from("second"));

        let e = enriched(&scopes);
        let items = e.property(SCOPE_PROPERTY_NAME).and_then(PropertyValue::as_sequence).unwrap();
        let names: Vec<_> = items.iter().filter_map(PropertyValue::as_str).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_guard_restores_snapshot() {
        let scopes = ScopeStack::new();
        {
            let _g = scopes.push_property("A", &Arg::from(1), false);
            assert_eq!(scopes.depth(), 1);
        }
        assert!(scopes.is_empty());
        assert!(enriched(&scopes).properties().is_empty());
    }

    #[test]
    fn test_out_of_order_drop_restores_push_time_state() {
        let scopes = ScopeStack::new();
        let outer = scopes.push_property("A", &Arg::from(1), false);
        let inner = scopes.push_property("B", &Arg::from(2), false);

        // Dropping the outer guard first rewinds past both frames
        drop(outer);
        assert!(scopes.is_empty());

        // The inner guard then restores the state seen when it was pushed
        drop(inner);
        assert_eq!(scopes.depth(), 1);
        assert!(enriched(&scopes).property("A").is_some());
    }

    #[test]
    fn test_push_properties_with_destructure_prefix() {
        #[derive(serde::Serialize)]
        struct Order {
            id: u32,
        }
        let order = Order { id: 7 };

        let scopes = ScopeStack::new();
        let _g = scopes.push_properties(vec![
            ("@Order", Arg::structured(&order)),
            ("Region", Arg::from("eu")),
        ]);

        let e = enriched(&scopes);
        assert_eq!(e.property("Order").and_then(PropertyValue::type_tag), Some("Order"));
        assert_eq!(e.property("Region").and_then(PropertyValue::as_str), Some("eu"));
        assert!(e.property(SCOPE_PROPERTY_NAME).is_none());
    }

    #[test]
    fn test_push_template_adds_properties_and_item() {
        let scopes = ScopeStack::new();
        let _g = scopes.push_template("Processing {OrderId}", &[Arg::from(42)]);

        let e = enriched(&scopes);
        assert_eq!(e.property("OrderId"), Some(&PropertyValue::from(42)));
        let items = e.property(SCOPE_PROPERTY_NAME).and_then(PropertyValue::as_sequence).unwrap();
        assert_eq!(items[0].as_str(), Some("Processing 42"));
    }

    #[test]
    fn test_clone_shares_chain_and_fork_does_not() {
        let scopes = ScopeStack::new();
        let shared = scopes.clone();
        let forked = scopes.fork();

        let _g = shared.push_property("A", &Arg::from(1), false);
        assert_eq!(scopes.depth(), 1);
        assert!(forked.is_empty());
    }

    #[test]
    fn test_trace_frame_sets_ids_when_absent() {
        let scopes = ScopeStack::new();
        let trace = TraceContext::new(TraceId::from_bytes([1; 16]), SpanId::from_bytes([2; 8]));
        let _outer = scopes.push_trace(TraceContext::new_root());
        let _inner = scopes.push_trace(trace);

        let e = enriched(&scopes);
        assert_eq!(e.trace_id(), Some(trace.trace_id));
        assert_eq!(e.span_id(), Some(trace.span_id));

        let mut preset = event();
        let existing = TraceId::from_bytes([9; 16]);
        preset.set_trace(existing, SpanId::from_bytes([9; 8]));
        scopes.enrich(&mut preset);
        assert_eq!(preset.trace_id(), Some(existing));
    }

    #[test]
    fn test_invalid_name_pushes_nothing() {
        let scopes = ScopeStack::new();
        let _g = scopes.push_property("not valid", &Arg::from(1), false);
        assert!(scopes.is_empty());
    }

    #[test]
    fn test_scope_survives_thread_hop() {
        let scopes = ScopeStack::new();
        let _g = scopes.push_property("Job", &Arg::from("nightly"), false);

        let carried = scopes.clone();
        let e = std::thread::spawn(move || enriched(&carried)).join().unwrap();
        assert_eq!(e.property("Job").and_then(PropertyValue::as_str), Some("nightly"));
    }
}
