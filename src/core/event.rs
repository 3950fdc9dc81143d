//! The structured log event and its attachments

use super::level::Level;
use super::template::MessageTemplate;
use super::tracing_context::{SpanId, TraceId};
use super::value::{LogEventProperty, PropertyValue};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A captured error attached to an event.
///
/// Errors are flattened into text at the call site so the event can cross
/// threads regardless of the error type's own bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct EventError {
    pub message: String,
    /// Messages of the `source()` chain, outermost first
    pub sources: Vec<String>,
    /// Extra key/value data carried by the error
    pub data: Vec<(String, PropertyValue)>,
}

impl EventError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sources: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut sources = Vec::new();
        let mut current = error.source();
        while let Some(source) = current {
            sources.push(source.to_string());
            current = source.source();
        }
        Self {
            message: error.to_string(),
            sources,
            data: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.data.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        for source in &self.sources {
            write!(f, "\n  caused by: {}", source)?;
        }
        Ok(())
    }
}

impl<E: std::error::Error + 'static> From<&E> for EventError {
    fn from(error: &E) -> Self {
        EventError::from_error(error)
    }
}

/// Numeric and/or named identifier of the kind of event
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EventId {
    pub id: i32,
    pub name: Option<String>,
}

impl EventId {
    pub const PROPERTY_NAME: &'static str = "EventId";

    pub fn new(id: i32) -> Self {
        Self { id, name: None }
    }

    pub fn named(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
        }
    }

    pub fn is_default(&self) -> bool {
        self.id == 0 && self.name.is_none()
    }

    /// The `EventId` structure, or `None` when nothing was set
    pub fn to_property_value(&self) -> Option<PropertyValue> {
        if self.is_default() {
            return None;
        }
        let mut properties = Vec::with_capacity(2);
        if self.id != 0 {
            properties.push(LogEventProperty::new("Id", self.id.into()));
        }
        if let Some(name) = &self.name {
            properties.push(LogEventProperty::new("Name", name.as_str().into()));
        }
        Some(PropertyValue::structure(None, properties))
    }
}

impl From<i32> for EventId {
    fn from(id: i32) -> Self {
        EventId::new(id)
    }
}

/// One structured, leveled occurrence.
///
/// Created once per log call and mutated only by the enrichment chain before
/// it is handed to the sink by value.
#[derive(Debug, Clone)]
pub struct LogEvent {
    timestamp: DateTime<Utc>,
    level: Level,
    exception: Option<EventError>,
    template: Arc<MessageTemplate>,
    properties: HashMap<String, PropertyValue>,
    trace_id: Option<TraceId>,
    span_id: Option<SpanId>,
}

impl LogEvent {
    pub fn new<I>(
        timestamp: DateTime<Utc>,
        level: Level,
        exception: Option<EventError>,
        template: Arc<MessageTemplate>,
        properties: I,
    ) -> Self
    where
        I: IntoIterator<Item = LogEventProperty>,
    {
        let properties = properties
            .into_iter()
            .map(|p| (p.name, p.value))
            .collect();
        Self {
            timestamp,
            level,
            exception,
            template,
            properties,
            trace_id: None,
            span_id: None,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn exception(&self) -> Option<&EventError> {
        self.exception.as_ref()
    }

    pub fn template(&self) -> &MessageTemplate {
        &self.template
    }

    pub fn properties(&self) -> &HashMap<String, PropertyValue> {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn trace_id(&self) -> Option<TraceId> {
        self.trace_id
    }

    pub fn span_id(&self) -> Option<SpanId> {
        self.span_id
    }

    pub fn set_trace(&mut self, trace_id: TraceId, span_id: SpanId) {
        self.trace_id = Some(trace_id);
        self.span_id = Some(span_id);
    }

    /// Last writer wins
    pub fn add_or_update_property(&mut self, property: LogEventProperty) {
        self.properties.insert(property.name, property.value);
    }

    /// First writer wins
    pub fn add_property_if_absent(&mut self, property: LogEventProperty) {
        self.properties
            .entry(property.name)
            .or_insert(property.value);
    }

    pub fn remove_property(&mut self, name: &str) -> Option<PropertyValue> {
        self.properties.remove(name)
    }

    pub fn render_message(&self) -> String {
        self.template.render(|name| self.properties.get(name))
    }

    /// Compact JSON shape: `@t`, `@mt`, `@l`, `@x`, `@tr`, `@sp` and properties
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert(
            "@t".to_string(),
            serde_json::Value::String(
                self.timestamp
                    .to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            ),
        );
        map.insert(
            "@mt".to_string(),
            serde_json::Value::String(self.template.text().to_string()),
        );
        if self.level != Level::Information {
            map.insert(
                "@l".to_string(),
                serde_json::Value::String(self.level.to_string()),
            );
        }
        if let Some(exception) = &self.exception {
            map.insert(
                "@x".to_string(),
                serde_json::Value::String(exception.to_string()),
            );
        }
        if let Some(trace_id) = self.trace_id {
            map.insert("@tr".to_string(), serde_json::Value::String(trace_id.to_hex()));
        }
        if let Some(span_id) = self.span_id {
            map.insert("@sp".to_string(), serde_json::Value::String(span_id.to_hex()));
        }
        for (name, value) in &self.properties {
            // Property names beginning with '@' are escaped to avoid clashes
            let key = if name.starts_with('@') {
                format!("@{}", name)
            } else {
                name.clone()
            };
            map.insert(key, value.to_json_value());
        }
        serde_json::Value::Object(map)
    }
}

impl serde::Serialize for LogEvent {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_value().serialize(serializer)
    }
}
