//! Row values as delivered by the backend.

use std::fmt;

use serde_json::Value;

/// One typed cell of a result row.
#[derive(Clone, Debug, PartialEq)]
pub enum Datum {
    Text(String),
    Int64(i64),
    UInt64(u64),
    Float64(f64),
    Boolean(bool),
    Null,
}

impl Datum {
    /// Canonical text form. Converter logic only ever looks at this, so an
    /// integer `200` and the string `"200"` are interchangeable.
    pub fn as_text(&self) -> String {
        self.to_string()
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Datum::Text(s) => s.is_empty(),
            Datum::Null => true,
            _ => false,
        }
    }

    /// Map a JSON value from `px -o json` output. Nested objects and arrays
    /// keep their JSON text so a headers map delivered as an object still
    /// decodes downstream.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(s) => Datum::Text(s),
            Value::Bool(b) => Datum::Boolean(b),
            Value::Null => Datum::Null,
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Datum::Int64(i)
                } else if let Some(u) = n.as_u64() {
                    Datum::UInt64(u)
                } else {
                    Datum::Float64(n.as_f64().unwrap_or_default())
                }
            }
            other @ (Value::Array(_) | Value::Object(_)) => Datum::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Text(s) => f.write_str(s),
            Datum::Int64(i) => write!(f, "{i}"),
            Datum::UInt64(u) => write!(f, "{u}"),
            Datum::Float64(v) => write!(f, "{v}"),
            Datum::Boolean(b) => write!(f, "{b}"),
            Datum::Null => Ok(()),
        }
    }
}

impl From<&str> for Datum {
    fn from(value: &str) -> Self {
        Datum::Text(value.to_string())
    }
}

impl From<String> for Datum {
    fn from(value: String) -> Self {
        Datum::Text(value)
    }
}

/// One observed HTTP exchange, cells in query projection order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TraceRecord {
    pub data: Vec<Datum>,
}

impl TraceRecord {
    pub fn new(data: Vec<Datum>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn text(&self, index: usize) -> Option<String> {
        self.data.get(index).map(Datum::as_text)
    }
}

impl<T: Into<Datum>> FromIterator<T> for TraceRecord {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Schema of a result table, handed to the row handler when it starts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableMetadata {
    pub name: String,
    pub columns: Vec<String>,
}
