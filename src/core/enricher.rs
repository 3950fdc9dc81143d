//! Enrichers add properties to events as they pass through a logger

use super::capture::PropertyFactory;
use super::event::LogEvent;
use super::self_log::panic_message;
use super::value::{LogEventProperty, PropertyValue};
use std::panic::{self, AssertUnwindSafe};

/// Adds or changes properties of an event before it reaches the sink.
///
/// Any closure `Fn(&mut LogEvent, &PropertyFactory)` is an enricher.
pub trait Enricher: Send + Sync {
    fn enrich(&self, event: &mut LogEvent, factory: &PropertyFactory);

    /// Name used when reporting a failure
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> Enricher for F
where
    F: Fn(&mut LogEvent, &PropertyFactory) + Send + Sync,
{
    fn enrich(&self, event: &mut LogEvent, factory: &PropertyFactory) {
        self(event, factory)
    }
}

/// Run one enricher, containing any panic it raises.
///
/// Returns `false` if the enricher panicked.
pub(crate) fn enrich_isolated(
    enricher: &dyn Enricher,
    event: &mut LogEvent,
    factory: &PropertyFactory,
) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| enricher.enrich(event, factory))) {
        Ok(()) => true,
        Err(payload) => {
            crate::self_log!(
                "Enricher '{}' panicked: {}",
                enricher.name(),
                panic_message(payload.as_ref())
            );
            false
        }
    }
}

/// Adds a fixed property unless the event already carries one by that name
#[derive(Debug, Clone)]
pub struct FixedPropertyEnricher {
    property: LogEventProperty,
}

impl FixedPropertyEnricher {
    pub fn new(property: LogEventProperty) -> Self {
        Self { property }
    }
}

impl Enricher for FixedPropertyEnricher {
    fn enrich(&self, event: &mut LogEvent, _factory: &PropertyFactory) {
        event.add_property_if_absent(self.property.clone());
    }

    fn name(&self) -> &str {
        "FixedPropertyEnricher"
    }
}

/// Applies several enrichers in order; one panicking does not stop the rest
pub struct SafeAggregateEnricher {
    enrichers: Vec<Box<dyn Enricher>>,
}

impl SafeAggregateEnricher {
    pub fn new(enrichers: Vec<Box<dyn Enricher>>) -> Self {
        Self { enrichers }
    }

    pub fn len(&self) -> usize {
        self.enrichers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enrichers.is_empty()
    }
}

impl Enricher for SafeAggregateEnricher {
    fn enrich(&self, event: &mut LogEvent, factory: &PropertyFactory) {
        for enricher in &self.enrichers {
            enrich_isolated(enricher.as_ref(), event, factory);
        }
    }

    fn name(&self) -> &str {
        "SafeAggregateEnricher"
    }
}

/// Attaches an error's key/value data as an `ExceptionData` structure
#[derive(Debug, Clone, Copy, Default)]
pub struct ExceptionDataEnricher;

impl ExceptionDataEnricher {
    pub const PROPERTY_NAME: &'static str = "ExceptionData";
}

impl Enricher for ExceptionDataEnricher {
    fn enrich(&self, event: &mut LogEvent, _factory: &PropertyFactory) {
        let properties = match event.exception() {
            Some(exception) if !exception.data.is_empty() => exception
                .data
                .iter()
                .map(|(key, value)| LogEventProperty::new(key.as_str(), value.clone()))
                .collect(),
            _ => return,
        };

        event.add_property_if_absent(LogEventProperty::new(
            Self::PROPERTY_NAME,
            PropertyValue::structure(None, properties),
        ));
    }

    fn name(&self) -> &str {
        "ExceptionDataEnricher"
    }
}
