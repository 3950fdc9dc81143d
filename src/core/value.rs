//! Structured property values captured from log calls

use serde::{Serialize, Serializer};
use std::fmt::{self, Write as _};

/// A primitive value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
}

impl Scalar {
    /// Render without quoting strings, as used inside rendered messages
    pub fn render_raw(&self, out: &mut String) {
        match self {
            Scalar::String(s) => out.push_str(s),
            other => {
                let _ = write!(out, "{}", other);
            }
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            Scalar::Null => serde_json::Value::Null,
            Scalar::Bool(b) => serde_json::Value::Bool(*b),
            Scalar::Int(i) => serde_json::Value::Number((*i).into()),
            Scalar::UInt(u) => serde_json::Value::Number((*u).into()),
            Scalar::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Scalar::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::UInt(u) => write!(f, "{}", u),
            Scalar::Float(fl) => write!(f, "{}", fl),
            Scalar::String(s) => {
                f.write_char('"')?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        c => f.write_char(c)?,
                    }
                }
                f.write_char('"')
            }
        }
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::String(s)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::String(s.to_string())
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<f64> for Scalar {
    fn from(f: f64) -> Self {
        Scalar::Float(f)
    }
}

impl From<f32> for Scalar {
    fn from(f: f32) -> Self {
        Scalar::Float(f as f64)
    }
}

impl From<char> for Scalar {
    fn from(c: char) -> Self {
        Scalar::String(c.to_string())
    }
}

macro_rules! impl_scalar_from_int {
    ($variant:ident as $target:ty: $($t:ty),*) => {
        $(
            impl From<$t> for Scalar {
                fn from(v: $t) -> Self {
                    Scalar::$variant(v as $target)
                }
            }
        )*
    };
}

impl_scalar_from_int!(Int as i64: i8, i16, i32, i64, isize);
impl_scalar_from_int!(UInt as u64: u8, u16, u32, u64, usize);

/// A named property attached to an event or nested in a structure
#[derive(Debug, Clone, PartialEq)]
pub struct LogEventProperty {
    pub name: String,
    pub value: PropertyValue,
}

impl LogEventProperty {
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Captured representation of a property value
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Scalar(Scalar),
    Sequence(Vec<PropertyValue>),
    Structure {
        type_tag: Option<String>,
        properties: Vec<LogEventProperty>,
    },
    Dictionary(Vec<(Scalar, PropertyValue)>),
}

impl PropertyValue {
    pub const NULL: PropertyValue = PropertyValue::Scalar(Scalar::Null);

    pub fn structure(type_tag: Option<String>, properties: Vec<LogEventProperty>) -> Self {
        PropertyValue::Structure {
            type_tag,
            properties,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            PropertyValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    pub fn as_sequence(&self) -> Option<&[PropertyValue]> {
        match self {
            PropertyValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a named member of a structure
    pub fn member(&self, name: &str) -> Option<&PropertyValue> {
        match self {
            PropertyValue::Structure { properties, .. } => properties
                .iter()
                .find(|p| p.name == name)
                .map(|p| &p.value),
            _ => None,
        }
    }

    pub fn type_tag(&self) -> Option<&str> {
        match self {
            PropertyValue::Structure { type_tag, .. } => type_tag.as_deref(),
            _ => None,
        }
    }

    /// Render as message text: top-level strings are not quoted
    pub fn render_raw(&self, out: &mut String) {
        match self {
            PropertyValue::Scalar(s) => s.render_raw(out),
            other => {
                let _ = write!(out, "{}", other);
            }
        }
    }

    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            PropertyValue::Scalar(s) => s.to_json_value(),
            PropertyValue::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(PropertyValue::to_json_value).collect())
            }
            PropertyValue::Structure {
                type_tag,
                properties,
            } => {
                let mut map = serde_json::Map::new();
                if let Some(tag) = type_tag {
                    map.insert("$type".to_string(), serde_json::Value::String(tag.clone()));
                }
                for p in properties {
                    map.insert(p.name.clone(), p.value.to_json_value());
                }
                serde_json::Value::Object(map)
            }
            PropertyValue::Dictionary(entries) => {
                let mut map = serde_json::Map::new();
                for (key, value) in entries {
                    let mut rendered = String::new();
                    key.render_raw(&mut rendered);
                    map.insert(rendered, value.to_json_value());
                }
                serde_json::Value::Object(map)
            }
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Scalar(s) => write!(f, "{}", s),
            PropertyValue::Sequence(items) => {
                f.write_char('[')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_char(']')
            }
            PropertyValue::Structure {
                type_tag,
                properties,
            } => {
                if let Some(tag) = type_tag {
                    write!(f, "{} ", tag)?;
                }
                f.write_str("{ ")?;
                for (i, p) in properties.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", p.name, p.value)?;
                }
                f.write_str(" }")
            }
            PropertyValue::Dictionary(entries) => {
                f.write_char('[')?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "({}: {})", key, value)?;
                }
                f.write_char(']')
            }
        }
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_value().serialize(serializer)
    }
}

impl From<Scalar> for PropertyValue {
    fn from(value: Scalar) -> Self {
        PropertyValue::Scalar(value)
    }
}

macro_rules! impl_value_from_scalar {
    ($($t:ty),*) => {
        $(
            impl From<$t> for PropertyValue {
                fn from(v: $t) -> Self {
                    PropertyValue::Scalar(Scalar::from(v))
                }
            }
        )*
    };
}

impl_value_from_scalar!(
    String, &str, bool, f32, f64, char, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize
);

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> PropertyValue {
        PropertyValue::structure(
            Some("Person".to_string()),
            vec![
                LogEventProperty::new("FirstName", "John".into()),
                LogEventProperty::new("Age", 42.into()),
            ],
        )
    }

    #[test]
    fn test_scalar_display_quotes_strings() {
        assert_eq!(Scalar::from("World").to_string(), "\"World\"");
        assert_eq!(Scalar::from("a\"b").to_string(), "\"a\\\"b\"");
        assert_eq!(Scalar::from(7).to_string(), "7");
        assert_eq!(Scalar::Null.to_string(), "null");
    }

    #[test]
    fn test_render_raw_leaves_strings_unquoted() {
        let mut out = String::new();
        PropertyValue::from("World").render_raw(&mut out);
        assert_eq!(out, "World");
    }

    #[test]
    fn test_structure_display() {
        assert_eq!(
            person().to_string(),
            "Person { FirstName: \"John\", Age: 42 }"
        );
    }

    #[test]
    fn test_sequence_and_dictionary_display() {
        let seq = PropertyValue::Sequence(vec![1.into(), 2.into()]);
        assert_eq!(seq.to_string(), "[1, 2]");

        let dict = PropertyValue::Dictionary(vec![(Scalar::from("a"), true.into())]);
        assert_eq!(dict.to_string(), "[(\"a\": true)]");
    }

    #[test]
    fn test_member_lookup() {
        let p = person();
        assert_eq!(p.member("FirstName").and_then(PropertyValue::as_str), Some("John"));
        assert!(p.member("Missing").is_none());
        assert_eq!(p.type_tag(), Some("Person"));
    }

    #[test]
    fn test_json_conversion() {
        let json = person().to_json_value();
        assert_eq!(json["$type"], "Person");
        assert_eq!(json["FirstName"], "John");
        assert_eq!(json["Age"], 42);

        let nan = PropertyValue::from(f64::NAN).to_json_value();
        assert!(nan.is_null());
    }
}
