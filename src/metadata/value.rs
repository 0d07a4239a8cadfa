//! Tagged representation of a single exiftool field value.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};

/// A field value as extracted from, or written to, exiftool.
///
/// exiftool's JSON output only carries strings, numbers and arrays for the
/// options this crate enables; anything else is kept as its JSON text.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Textual value.
    Text(String),
    /// Numeric value, preserving integer precision.
    Number(Number),
    /// Multi-valued field, e.g. `Keywords`.
    Sequence(Vec<String>),
    /// No value; written as a tag deletion.
    Absent,
}

impl FieldValue {
    /// String representations written as `-Name=value` directives.
    ///
    /// A sequence yields one string per element, `Absent` none.
    #[must_use]
    pub fn to_strings(&self) -> Vec<String> {
        match self {
            Self::Text(text) => vec![text.clone()],
            Self::Number(number) => vec![number.to_string()],
            Self::Sequence(items) => items.clone(),
            Self::Absent => Vec::new(),
        }
    }

    /// Whether the value stands for "delete this field".
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(number) => write!(f, "{number}"),
            Self::Sequence(items) => f.write_str(&items.join(", ")),
            Self::Absent => Ok(()),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Absent,
            Value::String(text) => Self::Text(text),
            Value::Number(number) => Self::Number(number),
            Value::Array(items) => Self::Sequence(items.into_iter().map(render_element).collect()),
            other @ (Value::Bool(_) | Value::Object(_)) => Self::Text(other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Self::from)
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<i64> for FieldValue {
    fn from(number: i64) -> Self {
        Self::Number(number.into())
    }
}

impl From<f64> for FieldValue {
    fn from(number: f64) -> Self {
        Number::from_f64(number).map_or_else(|| Self::Text(number.to_string()), Self::Number)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        Self::Sequence(items)
    }
}

fn render_element(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
