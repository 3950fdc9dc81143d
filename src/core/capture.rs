//! Capturing call-site arguments as property values
//!
//! Arguments are bound to template placeholders by [`PropertyFactory`]. How a
//! value is captured depends on the placeholder's marker:
//!
//! | marker | `serde::Serialize` value          | `Display` value | scalar        |
//! |--------|-----------------------------------|-----------------|---------------|
//! | none   | sequences/maps kept, structs text | text            | scalar        |
//! | `@`    | full structure                    | text            | scalar        |
//! | `$`    | text                              | text            | text          |
//!
//! Nested values are limited by the maximum destructuring depth; anything
//! deeper becomes `null` and a line is written to the self-log.

use super::self_log::panic_message;
use super::template::{is_valid_name, MessageTemplate};
use super::value::{LogEventProperty, PropertyValue, Scalar};
use serde::ser::{self, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

pub use super::template::Destructuring;

/// Default limit on how deeply nested values are captured
pub const DEFAULT_MAXIMUM_DESTRUCTURING_DEPTH: usize = 10;

/// A positional argument of a log call
#[derive(Clone)]
pub enum Arg<'a> {
    Scalar(Scalar),
    Display(&'a dyn fmt::Display),
    Serialize(&'a dyn Destructure),
    Value(PropertyValue),
}

impl<'a> Arg<'a> {
    /// Capture through `Display`
    pub fn display<T: fmt::Display>(value: &'a T) -> Self {
        Arg::Display(value)
    }

    /// Capture through `serde::Serialize`
    pub fn structured<T: Serialize>(value: &'a T) -> Self {
        Arg::Serialize(value)
    }

    /// Use an already captured value as is
    pub fn value(value: impl Into<PropertyValue>) -> Self {
        Arg::Value(value.into())
    }
}

impl fmt::Debug for Arg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Scalar(s) => f.debug_tuple("Scalar").field(s).finish(),
            Arg::Display(d) => f.debug_tuple("Display").field(&d.to_string()).finish(),
            Arg::Serialize(_) => f.write_str("Serialize(..)"),
            Arg::Value(v) => f.debug_tuple("Value").field(v).finish(),
        }
    }
}

macro_rules! impl_arg_from_scalar {
    ($($t:ty),*) => {
        $(
            impl<'a> From<$t> for Arg<'a> {
                fn from(v: $t) -> Self {
                    Arg::Scalar(Scalar::from(v))
                }
            }
        )*
    };
}

impl_arg_from_scalar!(
    String, &str, bool, f32, f64, char, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize
);

impl<'a> From<&'a String> for Arg<'a> {
    fn from(v: &'a String) -> Self {
        Arg::Scalar(Scalar::String(v.clone()))
    }
}

impl<'a> From<Scalar> for Arg<'a> {
    fn from(v: Scalar) -> Self {
        Arg::Scalar(v)
    }
}

impl<'a> From<PropertyValue> for Arg<'a> {
    fn from(v: PropertyValue) -> Self {
        Arg::Value(v)
    }
}

impl<'a, T> From<Option<T>> for Arg<'a>
where
    T: Into<Arg<'a>>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Arg::Scalar(Scalar::Null),
        }
    }
}

/// Object-safe view of a `serde::Serialize` value.
///
/// Implemented for every `Serialize` type; not meant to be implemented by hand.
pub trait Destructure {
    #[doc(hidden)]
    fn capture_structure(&self, factory: &PropertyFactory) -> PropertyValue;
}

impl<T: Serialize + ?Sized> Destructure for T {
    fn capture_structure(&self, factory: &PropertyFactory) -> PropertyValue {
        let captured = panic::catch_unwind(AssertUnwindSafe(|| {
            self.serialize(ValueSerializer { factory, depth: 1 })
        }));
        match captured {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                crate::self_log!("Capturing a property value failed: {}", e);
                PropertyValue::NULL
            }
            Err(payload) => {
                crate::self_log!(
                    "Capturing a property value panicked: {}",
                    panic_message(payload.as_ref())
                );
                PropertyValue::NULL
            }
        }
    }
}

/// Converts arguments into properties under the configured limits
#[derive(Debug, Clone)]
pub struct PropertyFactory {
    maximum_destructuring_depth: usize,
    maximum_string_length: Option<usize>,
    maximum_collection_count: Option<usize>,
}

impl Default for PropertyFactory {
    fn default() -> Self {
        Self {
            maximum_destructuring_depth: DEFAULT_MAXIMUM_DESTRUCTURING_DEPTH,
            maximum_string_length: None,
            maximum_collection_count: None,
        }
    }
}

impl PropertyFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Depth 1 is the top-level value; zero is treated as one
    #[must_use = "builder methods return a new value"]
    pub fn with_maximum_destructuring_depth(mut self, depth: usize) -> Self {
        self.maximum_destructuring_depth = depth.max(1);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_maximum_string_length(mut self, length: usize) -> Self {
        self.maximum_string_length = Some(length.max(1));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_maximum_collection_count(mut self, count: usize) -> Self {
        self.maximum_collection_count = Some(count);
        self
    }

    pub fn maximum_destructuring_depth(&self) -> usize {
        self.maximum_destructuring_depth
    }

    /// Capture a single value
    pub fn create_value(&self, arg: &Arg<'_>, destructuring: Destructuring) -> PropertyValue {
        match (arg, destructuring) {
            (Arg::Scalar(s), Destructuring::Stringify) => self.stringify(&PropertyValue::Scalar(s.clone())),
            (Arg::Scalar(s), _) => PropertyValue::Scalar(self.limit_scalar(s.clone())),
            (Arg::Display(d), _) => self.string(d.to_string()),
            (Arg::Serialize(v), Destructuring::Destructure) => v.capture_structure(self),
            (Arg::Serialize(v), Destructuring::Default) => self.collapse(v.capture_structure(self)),
            (Arg::Serialize(v), Destructuring::Stringify) => self.stringify(&v.capture_structure(self)),
            (Arg::Value(v), Destructuring::Stringify) => self.stringify(v),
            (Arg::Value(v), _) => v.clone(),
        }
    }

    pub fn create_property(
        &self,
        name: impl Into<String>,
        arg: &Arg<'_>,
        destructuring: Destructuring,
    ) -> LogEventProperty {
        LogEventProperty::new(name, self.create_value(arg, destructuring))
    }

    /// Like [`create_property`](Self::create_property) but validates the name.
    ///
    /// Returns `None` (and writes to the self-log) for an invalid name.
    pub fn bind_property(
        &self,
        name: &str,
        arg: &Arg<'_>,
        destructure: bool,
    ) -> Option<LogEventProperty> {
        if !is_valid_name(name) {
            crate::self_log!("Property name `{}` is not valid and was not bound", name);
            return None;
        }
        let destructuring = if destructure {
            Destructuring::Destructure
        } else {
            Destructuring::Default
        };
        Some(self.create_property(name, arg, destructuring))
    }

    /// Bind positional arguments to the template's placeholders.
    ///
    /// Surplus arguments are ignored; missing ones leave their placeholders
    /// unresolved. Mismatches are reported to the self-log.
    pub fn bind_template(
        &self,
        template: Arc<MessageTemplate>,
        args: &[Arg<'_>],
    ) -> (Arc<MessageTemplate>, Vec<LogEventProperty>) {
        let placeholders = template.property_tokens().count();

        if args.is_empty() {
            if placeholders > 0 {
                crate::self_log!(
                    "Required properties not provided for: {}",
                    template.text()
                );
            }
            return (template, Vec::new());
        }

        let properties = if template.is_positional() {
            self.bind_positional(&template, args)
        } else {
            self.bind_named(&template, args)
        };
        (template, properties)
    }

    fn bind_named(&self, template: &MessageTemplate, args: &[Arg<'_>]) -> Vec<LogEventProperty> {
        let tokens: Vec<_> = template.property_tokens().collect();
        if tokens.len() != args.len() {
            crate::self_log!(
                "Named property count does not match parameter count: {}",
                template.text()
            );
        }

        tokens
            .iter()
            .zip(args)
            .map(|(token, arg)| self.create_property(token.name.as_str(), arg, token.destructuring))
            .collect()
    }

    fn bind_positional(
        &self,
        template: &MessageTemplate,
        args: &[Arg<'_>],
    ) -> Vec<LogEventProperty> {
        let mut properties: Vec<LogEventProperty> = Vec::new();
        let mut used = vec![false; args.len()];

        for token in template.property_tokens() {
            let Some(position) = token.position() else {
                continue;
            };
            match args.get(position) {
                Some(arg) => {
                    used[position] = true;
                    if properties.iter().any(|p| p.name == token.name) {
                        continue;
                    }
                    properties.push(self.create_property(token.name.as_str(), arg, token.destructuring));
                }
                None => {
                    crate::self_log!("Unassigned positional value {} in: {}", position, template.text());
                }
            }
        }

        if used.iter().any(|u| !u) {
            crate::self_log!(
                "Positional property count does not match parameter count: {}",
                template.text()
            );
        }

        properties
    }

    /// Default capture keeps sequences and dictionaries; structures become text
    fn collapse(&self, value: PropertyValue) -> PropertyValue {
        match value {
            structure @ PropertyValue::Structure { .. } => self.string(structure.to_string()),
            PropertyValue::Sequence(items) => {
                PropertyValue::Sequence(items.into_iter().map(|v| self.collapse(v)).collect())
            }
            PropertyValue::Dictionary(entries) => PropertyValue::Dictionary(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, self.collapse(v)))
                    .collect(),
            ),
            scalar => scalar,
        }
    }

    fn stringify(&self, value: &PropertyValue) -> PropertyValue {
        let mut rendered = String::new();
        value.render_raw(&mut rendered);
        self.string(rendered)
    }

    fn string(&self, value: String) -> PropertyValue {
        PropertyValue::Scalar(Scalar::String(self.truncate(value)))
    }

    fn limit_scalar(&self, scalar: Scalar) -> Scalar {
        match scalar {
            Scalar::String(s) => Scalar::String(self.truncate(s)),
            other => other,
        }
    }

    fn truncate(&self, value: String) -> String {
        match self.maximum_string_length {
            Some(max) if value.chars().count() > max => {
                let mut truncated: String = value.chars().take(max - 1).collect();
                truncated.push('…');
                truncated
            }
            _ => value,
        }
    }

    fn collection_full(&self, len: usize) -> bool {
        self.maximum_collection_count.is_some_and(|max| len >= max)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct CaptureError(String);

impl ser::Error for CaptureError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        CaptureError(msg.to_string())
    }
}

/// Serializes any `Serialize` value into a [`PropertyValue`] tree
struct ValueSerializer<'f> {
    factory: &'f PropertyFactory,
    depth: usize,
}

impl<'f> ValueSerializer<'f> {
    fn child<T: Serialize + ?Sized>(&self, value: &T) -> Result<PropertyValue, CaptureError> {
        if self.depth >= self.factory.maximum_destructuring_depth {
            crate::self_log!("Maximum destructuring depth reached.");
            return Ok(PropertyValue::NULL);
        }
        value.serialize(ValueSerializer {
            factory: self.factory,
            depth: self.depth + 1,
        })
    }

    fn scalar(self, scalar: Scalar) -> Result<PropertyValue, CaptureError> {
        Ok(PropertyValue::Scalar(self.factory.limit_scalar(scalar)))
    }

    fn structure(self, type_tag: Option<&str>, len: usize) -> StructureCollector<'f> {
        StructureCollector {
            ser: self,
            type_tag: type_tag.map(str::to_string),
            properties: Vec::with_capacity(len),
        }
    }
}

impl<'f> ser::Serializer for ValueSerializer<'f> {
    type Ok = PropertyValue;
    type Error = CaptureError;

    type SerializeSeq = SequenceCollector<'f>;
    type SerializeTuple = SequenceCollector<'f>;
    type SerializeTupleStruct = SequenceCollector<'f>;
    type SerializeTupleVariant = StructureCollector<'f>;
    type SerializeMap = DictionaryCollector<'f>;
    type SerializeStruct = StructureCollector<'f>;
    type SerializeStructVariant = StructureCollector<'f>;

    fn serialize_bool(self, v: bool) -> Result<Self::Ok, Self::Error> {
        self.scalar(Scalar::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Self::Ok, Self::Error> {
        self.scalar(Scalar::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Self::Ok, Self::Error> {
        self.scalar(Scalar::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Self::Ok, Self::Error> {
        self.scalar(Scalar::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Self::Ok, Self::Error> {
        self.scalar(Scalar::Int(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Self::Ok, Self::Error> {
        match i64::try_from(v) {
            Ok(v) => self.scalar(Scalar::Int(v)),
            Err(_) => self.scalar(Scalar::String(v.to_string())),
        }
    }

    fn serialize_u8(self, v: u8) -> Result<Self::Ok, Self::Error> {
        self.scalar(Scalar::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Self::Ok, Self::Error> {
        self.scalar(Scalar::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Self::Ok, Self::Error> {
        self.scalar(Scalar::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Self::Ok, Self::Error> {
        self.scalar(Scalar::UInt(v))
    }

    fn serialize_u128(self, v: u128) -> Result<Self::Ok, Self::Error> {
        match u64::try_from(v) {
            Ok(v) => self.scalar(Scalar::UInt(v)),
            Err(_) => self.scalar(Scalar::String(v.to_string())),
        }
    }

    fn serialize_f32(self, v: f32) -> Result<Self::Ok, Self::Error> {
        self.scalar(Scalar::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Self::Ok, Self::Error> {
        self.scalar(Scalar::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Self::Ok, Self::Error> {
        self.scalar(Scalar::from(v))
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok, Self::Error> {
        self.scalar(Scalar::from(v))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Self::Ok, Self::Error> {
        let mut seq = ser::Serializer::serialize_seq(self, Some(v.len()))?;
        for b in v {
            ser::SerializeSeq::serialize_element(&mut seq, b)?;
        }
        ser::SerializeSeq::end(seq)
    }

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        Ok(PropertyValue::NULL)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Self::Ok, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        Ok(PropertyValue::NULL)
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<Self::Ok, Self::Error> {
        self.scalar(Scalar::from(name))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        self.scalar(Scalar::from(variant))
    }

    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        let mut structure = self.structure(Some(variant), 1);
        ser::SerializeTupleVariant::serialize_field(&mut structure, value)?;
        ser::SerializeTupleVariant::end(structure)
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        Ok(SequenceCollector {
            ser: self,
            items: Vec::with_capacity(len.unwrap_or(0).min(64)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Ok(self.structure(Some(variant), len))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        Ok(DictionaryCollector {
            ser: self,
            entries: Vec::new(),
            pending_key: None,
        })
    }

    fn serialize_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        Ok(self.structure(Some(name), len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Ok(self.structure(Some(variant), len))
    }
}

struct SequenceCollector<'f> {
    ser: ValueSerializer<'f>,
    items: Vec<PropertyValue>,
}

impl SequenceCollector<'_> {
    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CaptureError> {
        if self.ser.factory.collection_full(self.items.len()) {
            return Ok(());
        }
        let item = self.ser.child(value)?;
        self.items.push(item);
        Ok(())
    }
}

impl ser::SerializeSeq for SequenceCollector<'_> {
    type Ok = PropertyValue;
    type Error = CaptureError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(PropertyValue::Sequence(self.items))
    }
}

impl ser::SerializeTuple for SequenceCollector<'_> {
    type Ok = PropertyValue;
    type Error = CaptureError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(PropertyValue::Sequence(self.items))
    }
}

impl ser::SerializeTupleStruct for SequenceCollector<'_> {
    type Ok = PropertyValue;
    type Error = CaptureError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(PropertyValue::Sequence(self.items))
    }
}

struct StructureCollector<'f> {
    ser: ValueSerializer<'f>,
    type_tag: Option<String>,
    properties: Vec<LogEventProperty>,
}

impl StructureCollector<'_> {
    fn field<T: ?Sized + Serialize>(&mut self, name: String, value: &T) -> Result<(), CaptureError> {
        let value = self.ser.child(value)?;
        self.properties.push(LogEventProperty::new(name, value));
        Ok(())
    }

    fn finish(self) -> PropertyValue {
        PropertyValue::structure(self.type_tag, self.properties)
    }
}

impl ser::SerializeStruct for StructureCollector<'_> {
    type Ok = PropertyValue;
    type Error = CaptureError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.field(key.to_string(), value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(self.finish())
    }
}

impl ser::SerializeStructVariant for StructureCollector<'_> {
    type Ok = PropertyValue;
    type Error = CaptureError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.field(key.to_string(), value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(self.finish())
    }
}

/// Tuple variant members are named by position: `0`, `1`, ...
impl ser::SerializeTupleVariant for StructureCollector<'_> {
    type Ok = PropertyValue;
    type Error = CaptureError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        let name = self.properties.len().to_string();
        self.field(name, value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(self.finish())
    }
}

struct DictionaryCollector<'f> {
    ser: ValueSerializer<'f>,
    entries: Vec<(Scalar, PropertyValue)>,
    pending_key: Option<Scalar>,
}

impl ser::SerializeMap for DictionaryCollector<'_> {
    type Ok = PropertyValue;
    type Error = CaptureError;

    fn serialize_key<T>(&mut self, key: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        let key = match self.ser.child(key)? {
            PropertyValue::Scalar(scalar) => scalar,
            other => Scalar::String(other.to_string()),
        };
        self.pending_key = Some(key);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| CaptureError("map value serialized before its key".to_string()))?;
        if self.ser.factory.collection_full(self.entries.len()) {
            return Ok(());
        }
        let value = self.ser.child(value)?;
        self.entries.push((key, value));
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(PropertyValue::Dictionary(self.entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::self_log::testing::capture;
    use serde::Serialize;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct Person {
        first_name: String,
        age: u32,
    }

    #[derive(Serialize)]
    struct Node {
        value: u32,
        next: Option<Box<Node>>,
    }

    fn chain(len: u32) -> Node {
        let mut node = Node {
            value: len,
            next: None,
        };
        for value in (0..len).rev() {
            node = Node {
                value,
                next: Some(Box::new(node)),
            };
        }
        node
    }

    fn depth_of(value: &PropertyValue) -> usize {
        match value.member("next") {
            Some(next) if next.as_scalar().map_or(false, Scalar::is_null) => 1,
            Some(next) => 1 + depth_of(next),
            None => 1,
        }
    }

    fn person() -> Person {
        Person {
            first_name: "John".to_string(),
            age: 42,
        }
    }

    #[test]
    fn test_destructure_builds_structure() {
        let factory = PropertyFactory::new();
        let p = person();
        let value = factory.create_value(&Arg::structured(&p), Destructuring::Destructure);

        assert_eq!(value.type_tag(), Some("Person"));
        assert_eq!(value.member("FirstName").and_then(PropertyValue::as_str), Some("John"));
        assert_eq!(value.member("Age"), Some(&PropertyValue::from(42u32)));
    }

    #[test]
    fn test_default_capture_collapses_structures_only() {
        let factory = PropertyFactory::new();
        let p = person();
        let value = factory.create_value(&Arg::structured(&p), Destructuring::Default);
        assert_eq!(
            value.as_str(),
            Some("Person { FirstName: \"John\", Age: 42 }")
        );

        let list = vec![1, 2, 3];
        let value = factory.create_value(&Arg::structured(&list), Destructuring::Default);
        assert_eq!(value.as_sequence().map(<[_]>::len), Some(3));

        let mut map = BTreeMap::new();
        map.insert("a", 1);
        let value = factory.create_value(&Arg::structured(&map), Destructuring::Default);
        assert!(matches!(value, PropertyValue::Dictionary(ref e) if e.len() == 1));
    }

    #[test]
    fn test_stringify() {
        let factory = PropertyFactory::new();
        let value = factory.create_value(&Arg::from(42), Destructuring::Stringify);
        assert_eq!(value.as_str(), Some("42"));

        let list = vec![1, 2];
        let value = factory.create_value(&Arg::structured(&list), Destructuring::Stringify);
        assert_eq!(value.as_str(), Some("[1, 2]"));
    }

    #[test]
    fn test_display_args_become_strings() {
        let factory = PropertyFactory::new();
        let addr = std::net::Ipv4Addr::LOCALHOST;
        let value = factory.create_value(&Arg::display(&addr), Destructuring::Destructure);
        assert_eq!(value.as_str(), Some("127.0.0.1"));
    }

    #[test]
    fn test_depth_limit_truncates_to_null() {
        let factory = PropertyFactory::new().with_maximum_destructuring_depth(3);
        let node = chain(10);

        let lines = capture(|| {
            let value = factory.create_value(&Arg::structured(&node), Destructuring::Destructure);
            assert_eq!(depth_of(&value), 3);
        });
        assert!(lines
            .iter()
            .any(|l| l.ends_with("Maximum destructuring depth reached.")));
    }

    #[test]
    fn test_default_depth_limit() {
        let factory = PropertyFactory::new();
        let node = chain(50);
        let value = factory.create_value(&Arg::structured(&node), Destructuring::Destructure);
        // Each level of Node is a structure, and Option<Box<_>> adds no depth
        assert_eq!(depth_of(&value), DEFAULT_MAXIMUM_DESTRUCTURING_DEPTH);
    }

    #[test]
    fn test_string_and_collection_limits() {
        let factory = PropertyFactory::new()
            .with_maximum_string_length(5)
            .with_maximum_collection_count(2);

        let value = factory.create_value(&Arg::from("abcdefgh"), Destructuring::Default);
        assert_eq!(value.as_str(), Some("abcd…"));

        let list = vec![1, 2, 3, 4];
        let value = factory.create_value(&Arg::structured(&list), Destructuring::Default);
        assert_eq!(value.as_sequence().map(<[_]>::len), Some(2));
    }

    #[test]
    fn test_enum_variants() {
        #[derive(Serialize)]
        enum Shape {
            Empty,
            Circle(f64),
            Rect { w: u32, h: u32 },
        }

        let factory = PropertyFactory::new();
        let unit = factory.create_value(&Arg::structured(&Shape::Empty), Destructuring::Destructure);
        assert_eq!(unit.as_str(), Some("Empty"));

        let circle = factory.create_value(&Arg::structured(&Shape::Circle(1.5)), Destructuring::Destructure);
        assert_eq!(circle.type_tag(), Some("Circle"));
        assert_eq!(circle.member("0"), Some(&PropertyValue::from(1.5)));

        let rect = factory.create_value(&Arg::structured(&Shape::Rect { w: 2, h: 3 }), Destructuring::Destructure);
        assert_eq!(rect.type_tag(), Some("Rect"));
        assert_eq!(rect.member("h"), Some(&PropertyValue::from(3u32)));
    }

    #[test]
    fn test_failing_serialize_becomes_null() {
        struct Broken;
        impl Serialize for Broken {
            fn serialize<S: serde::Serializer>(&self, _s: S) -> std::result::Result<S::Ok, S::Error> {
                Err(serde::ser::Error::custom("cannot serialize"))
            }
        }

        let factory = PropertyFactory::new();
        let lines = capture(|| {
            let value = factory.create_value(&Arg::structured(&Broken), Destructuring::Destructure);
            assert_eq!(value, PropertyValue::NULL);
        });
        assert!(lines.iter().any(|l| l.contains("cannot serialize")));
    }

    #[test]
    fn test_bind_named_in_order() {
        let factory = PropertyFactory::new();
        let template = Arc::new(MessageTemplate::parse("{A} and {B}"));
        let (_, props) = factory.bind_template(template, &[Arg::from(1), Arg::from("two")]);

        assert_eq!(props.len(), 2);
        assert_eq!(props[0].name, "A");
        assert_eq!(props[1].value.as_str(), Some("two"));
    }

    #[test]
    fn test_bind_surplus_and_missing() {
        let factory = PropertyFactory::new();

        let lines = capture(|| {
            let template = Arc::new(MessageTemplate::parse("{A}"));
            let (_, props) = factory.bind_template(template, &[Arg::from(1), Arg::from(2)]);
            assert_eq!(props.len(), 1);

            let template = Arc::new(MessageTemplate::parse("{A} {B}"));
            let (_, props) = factory.bind_template(template, &[Arg::from(1)]);
            assert_eq!(props.len(), 1);
        });
        assert!(lines
            .iter()
            .any(|l| l.contains("Named property count does not match parameter count")));
    }

    #[test]
    fn test_bind_positional() {
        let factory = PropertyFactory::new();
        let template = Arc::new(MessageTemplate::parse("{1} before {0}"));
        let (_, props) = factory.bind_template(template, &[Arg::from("zero"), Arg::from("one")]);

        let one = props.iter().find(|p| p.name == "1").unwrap();
        assert_eq!(one.value.as_str(), Some("one"));
        let zero = props.iter().find(|p| p.name == "0").unwrap();
        assert_eq!(zero.value.as_str(), Some("zero"));
    }

    #[test]
    fn test_bind_property_rejects_invalid_names() {
        let factory = PropertyFactory::new();
        assert!(factory.bind_property("", &Arg::from(1), false).is_none());
        assert!(factory.bind_property("has space", &Arg::from(1), false).is_none());

        let p = person();
        let bound = factory.bind_property("User", &Arg::structured(&p), true).unwrap();
        assert_eq!(bound.value.type_tag(), Some("Person"));
    }
}
