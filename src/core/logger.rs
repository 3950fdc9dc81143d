//! Main logger implementation
//!
//! A [`Logger`] is a cheap handle to an immutable node. Child loggers created
//! with `for_*` share their parent's pipeline and add an enricher, so the
//! receiver is never changed. Writing runs the level gate, then every
//! enricher from the child up to the root, then hands the event to the sink.

use super::{
    capture::{Arg, PropertyFactory},
    enricher::{enrich_isolated, Enricher, ExceptionDataEnricher, FixedPropertyEnricher, SafeAggregateEnricher},
    error::Result,
    event::{EventError, EventId, LogEvent},
    level::Level,
    level_switch::LevelSwitch,
    override_map::LevelOverrideMap,
    scope::{ScopeEnricher, ScopeStack},
    self_log::panic_message,
    sink::{SafeAggregateSink, Sink},
    template::TemplateCache,
    value::{LogEventProperty, PropertyValue},
};
use chrono::Utc;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Name of the property identifying where an event came from
pub const SOURCE_CONTEXT_PROPERTY_NAME: &str = "SourceContext";

/// State shared by a root logger and all of its children
struct Pipeline {
    sink: Option<Box<dyn Sink>>,
    overrides: Option<LevelOverrideMap>,
    factory: PropertyFactory,
    templates: TemplateCache,
    disposed: AtomicBool,
}

impl Pipeline {
    fn emit(&self, event: LogEvent) {
        let Some(sink) = &self.sink else {
            return;
        };
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| sink.emit(event))) {
            crate::self_log!(
                "Sink '{}' panicked: {}",
                sink.name(),
                panic_message(payload.as_ref())
            );
        }
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(sink) = &self.sink {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| sink.dispose())) {
                crate::self_log!(
                    "Sink '{}' panicked during disposal: {}",
                    sink.name(),
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.dispose();
    }
}

struct Node {
    parent: Option<Arc<Node>>,
    enricher: Option<Box<dyn Enricher>>,
    switch: Option<Arc<LevelSwitch>>,
    pipeline: Arc<Pipeline>,
}

/// Handle for writing events into a pipeline
#[derive(Clone)]
pub struct Logger {
    node: Arc<Node>,
}

impl Logger {
    /// Create a builder for Logger
    ///
    /// # Example
    /// ```
    /// use rust_event_logger::prelude::*;
    ///
    /// let logger = Logger::builder()
    ///     .minimum_level(Level::Debug)
    ///     .enrich_with_property("Application", "billing")
    ///     .build()
    ///     .unwrap();
    ///
    /// assert!(logger.is_enabled(Level::Debug));
    /// ```
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// A logger that discards everything
    #[must_use]
    pub fn none() -> Self {
        Self {
            node: Arc::new(Node {
                parent: None,
                enricher: None,
                switch: None,
                pipeline: Arc::new(Pipeline {
                    sink: None,
                    overrides: None,
                    factory: PropertyFactory::default(),
                    templates: TemplateCache::new(),
                    disposed: AtomicBool::new(false),
                }),
            }),
        }
    }

    fn child(&self, enricher: Box<dyn Enricher>, switch: Option<Arc<LevelSwitch>>) -> Self {
        Self {
            node: Arc::new(Node {
                parent: Some(Arc::clone(&self.node)),
                enricher: Some(enricher),
                switch,
                pipeline: Arc::clone(&self.node.pipeline),
            }),
        }
    }

    /// A child logger that also applies `enricher`
    #[must_use]
    pub fn for_enricher<E: Enricher + 'static>(&self, enricher: E) -> Self {
        self.child(Box::new(enricher), self.node.switch.clone())
    }

    /// A child logger applying several enrichers, each isolated from the others
    #[must_use]
    pub fn for_enrichers(&self, enrichers: Vec<Box<dyn Enricher>>) -> Self {
        if enrichers.is_empty() {
            return self.clone();
        }
        self.for_enricher(SafeAggregateEnricher::new(enrichers))
    }

    /// A child logger attaching a fixed property.
    ///
    /// An invalid name is reported to the self-log and an equivalent logger
    /// is returned.
    #[must_use]
    pub fn for_context(&self, name: &str, value: &Arg<'_>, destructure: bool) -> Self {
        match self
            .node
            .pipeline
            .factory
            .bind_property(name, value, destructure)
        {
            Some(property) => self.for_enricher(FixedPropertyEnricher::new(property)),
            None => self.clone(),
        }
    }

    /// A child logger for a named source.
    ///
    /// Sets `SourceContext` and resolves the source's level override once.
    #[must_use]
    pub fn for_source(&self, source: &str) -> Self {
        let switch = match &self.node.pipeline.overrides {
            Some(overrides) => Some(overrides.resolve(source)),
            None => self.node.switch.clone(),
        };
        let property = LogEventProperty::new(SOURCE_CONTEXT_PROPERTY_NAME, PropertyValue::from(source));
        self.child(Box::new(FixedPropertyEnricher::new(property)), switch)
    }

    /// [`for_source`](Self::for_source) using the type's path as the source
    #[must_use]
    pub fn for_type<T: ?Sized>(&self) -> Self {
        self.for_source(std::any::type_name::<T>())
    }

    /// A child logger applying the scopes active on `scopes` to every event
    #[must_use]
    pub fn with_scope(&self, scopes: &ScopeStack) -> Self {
        self.for_enricher(ScopeEnricher::new(scopes.clone()))
    }

    #[inline]
    pub fn is_enabled(&self, level: Level) -> bool {
        match &self.node.switch {
            Some(switch) => switch.is_enabled(level),
            None => true,
        }
    }

    /// Gate, enrich and dispatch an event
    pub fn write(&self, event: LogEvent) {
        if !self.is_enabled(event.level()) {
            return;
        }
        self.dispatch(event);
    }

    fn dispatch(&self, mut event: LogEvent) {
        let pipeline = &self.node.pipeline;
        if pipeline.sink.is_none() {
            return;
        }

        let mut node = Some(&self.node);
        while let Some(n) = node {
            if let Some(enricher) = &n.enricher {
                enrich_isolated(enricher.as_ref(), &mut event, &pipeline.factory);
            }
            node = n.parent.as_ref();
        }

        pipeline.emit(event);
    }

    pub fn log(&self, level: Level, template: &str, args: &[Arg<'_>]) {
        self.log_call(LogCall::new(level, template).args(args));
    }

    /// Write a fully described log call
    pub fn log_call(&self, call: LogCall<'_, '_>) {
        if !self.is_enabled(call.level) {
            return;
        }

        let pipeline = &self.node.pipeline;
        let template = pipeline.templates.parse(call.template);
        let (template, properties) = pipeline.factory.bind_template(template, call.args);
        let mut event = LogEvent::new(Utc::now(), call.level, call.exception, template, properties);

        if let Some(value) = call.event_id.as_ref().and_then(EventId::to_property_value) {
            event.add_or_update_property(LogEventProperty::new(EventId::PROPERTY_NAME, value));
        }

        self.dispatch(event);
    }

    pub fn trace(&self, template: &str, args: &[Arg<'_>]) {
        self.log(Level::Trace, template, args);
    }

    pub fn debug(&self, template: &str, args: &[Arg<'_>]) {
        self.log(Level::Debug, template, args);
    }

    pub fn info(&self, template: &str, args: &[Arg<'_>]) {
        self.log(Level::Information, template, args);
    }

    pub fn warn(&self, template: &str, args: &[Arg<'_>]) {
        self.log(Level::Warning, template, args);
    }

    pub fn error(&self, template: &str, args: &[Arg<'_>]) {
        self.log(Level::Error, template, args);
    }

    pub fn critical(&self, template: &str, args: &[Arg<'_>]) {
        self.log(Level::Critical, template, args);
    }

    /// Dispose the terminal sink, flushing buffered events.
    ///
    /// Only the first call has an effect; afterwards every logger sharing
    /// the pipeline discards events.
    pub fn dispose(&self) {
        self.node.pipeline.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.node.pipeline.disposed.load(Ordering::Acquire)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("minimum_level", &self.node.switch.as_ref().map(|s| s.minimum_level()))
            .field("has_sink", &self.node.pipeline.sink.is_some())
            .finish()
    }
}

/// Re-dispatch into this logger without applying its level gate
impl Sink for Logger {
    fn emit(&self, event: LogEvent) {
        self.dispatch(event);
    }

    fn dispose(&self) {
        Logger::dispose(self);
    }

    fn name(&self) -> &str {
        "Logger"
    }
}

/// One log call: level, template, arguments and optional attachments
#[derive(Debug)]
pub struct LogCall<'t, 'a> {
    level: Level,
    template: &'t str,
    args: &'t [Arg<'a>],
    exception: Option<EventError>,
    event_id: Option<EventId>,
}

impl<'t, 'a> LogCall<'t, 'a> {
    pub fn new(level: Level, template: &'t str) -> Self {
        Self {
            level,
            template,
            args: &[],
            exception: None,
            event_id: None,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn args(mut self, args: &'t [Arg<'a>]) -> Self {
        self.args = args;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn exception(mut self, exception: impl Into<EventError>) -> Self {
        self.exception = Some(exception.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn event_id(mut self, event_id: impl Into<EventId>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use rust_event_logger::prelude::*;
/// use std::sync::Arc;
///
/// let switch = Arc::new(LevelSwitch::new(Level::Warning));
/// let logger = Logger::builder()
///     .level_switch(Arc::clone(&switch))
///     .override_level("noisy::module", Level::Error)
///     .enrich_with_exception_data()
///     .build()
///     .unwrap();
///
/// assert!(!logger.is_enabled(Level::Information));
/// switch.set_minimum_level(Level::Information);
/// assert!(logger.is_enabled(Level::Information));
/// ```
pub struct LoggerBuilder {
    minimum_level: Level,
    level_switch: Option<Arc<LevelSwitch>>,
    overrides: Vec<(String, Arc<LevelSwitch>)>,
    enrichers: Vec<Box<dyn Enricher>>,
    sinks: Vec<Box<dyn Sink>>,
    factory: PropertyFactory,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            minimum_level: Level::Information,
            level_switch: None,
            overrides: Vec::new(),
            enrichers: Vec::new(),
            sinks: Vec::new(),
            factory: PropertyFactory::default(),
        }
    }

    /// Set a fixed minimum level
    #[must_use = "builder methods return a new value"]
    pub fn minimum_level(mut self, level: Level) -> Self {
        self.minimum_level = level;
        self.level_switch = None;
        self
    }

    /// Control the minimum level through a shared switch
    #[must_use = "builder methods return a new value"]
    pub fn level_switch(mut self, switch: Arc<LevelSwitch>) -> Self {
        self.level_switch = Some(switch);
        self
    }

    /// Use a fixed minimum level for a source prefix
    #[must_use = "builder methods return a new value"]
    pub fn override_level(self, source: impl Into<String>, level: Level) -> Self {
        self.override_switch(source, Arc::new(LevelSwitch::new(level)))
    }

    #[must_use = "builder methods return a new value"]
    pub fn override_switch(mut self, source: impl Into<String>, switch: Arc<LevelSwitch>) -> Self {
        self.overrides.push((source.into(), switch));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn enrich<E: Enricher + 'static>(mut self, enricher: E) -> Self {
        self.enrichers.push(Box::new(enricher));
        self
    }

    /// Add a property to every event that does not already carry it
    #[must_use = "builder methods return a new value"]
    pub fn enrich_with_property(
        self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.enrich(FixedPropertyEnricher::new(LogEventProperty::new(name, value.into())))
    }

    #[must_use = "builder methods return a new value"]
    pub fn enrich_with_exception_data(self) -> Self {
        self.enrich(ExceptionDataEnricher)
    }

    /// Add a sink; several sinks are fanned out with panic isolation
    #[must_use = "builder methods return a new value"]
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn maximum_destructuring_depth(mut self, depth: usize) -> Self {
        self.factory = self.factory.with_maximum_destructuring_depth(depth);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn maximum_string_length(mut self, length: usize) -> Self {
        self.factory = self.factory.with_maximum_string_length(length);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn maximum_collection_count(mut self, count: usize) -> Self {
        self.factory = self.factory.with_maximum_collection_count(count);
        self
    }

    /// Build the Logger
    ///
    /// Fails only for an override with an empty source name.
    pub fn build(self) -> Result<Logger> {
        let root = self
            .level_switch
            .unwrap_or_else(|| Arc::new(LevelSwitch::new(self.minimum_level)));

        let overrides = if self.overrides.is_empty() {
            None
        } else {
            Some(LevelOverrideMap::new(self.overrides, Arc::clone(&root))?)
        };

        let mut sinks = self.sinks;
        let sink = match sinks.len() {
            0 => None,
            1 => sinks.pop(),
            _ => Some(Box::new(SafeAggregateSink::new(sinks)) as Box<dyn Sink>),
        };

        let mut enrichers = self.enrichers;
        let enricher = match enrichers.len() {
            0 => None,
            1 => enrichers.pop(),
            _ => Some(Box::new(SafeAggregateEnricher::new(enrichers)) as Box<dyn Enricher>),
        };

        Ok(Logger {
            node: Arc::new(Node {
                parent: None,
                enricher,
                switch: Some(root),
                pipeline: Arc::new(Pipeline {
                    sink,
                    overrides,
                    factory: self.factory,
                    templates: TemplateCache::new(),
                    disposed: AtomicBool::new(false),
                }),
            }),
        })
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
