//! Column values as delivered by the replication source.

use serde::{Deserialize, Serialize};

/// A single column value.
///
/// Sources convert their native values into this small set of variants so
/// that row mapping never depends on a driver crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowValue {
    /// SQL NULL
    Null,

    /// Signed integer
    Int(i64),

    /// Unsigned integer (BIGINT UNSIGNED and friends)
    UInt(u64),

    /// Floating point
    Float(f64),

    /// Text value (also used for temporal and decimal columns)
    Text(String),

    /// Raw bytes that were not valid UTF-8 at the source
    Bytes(Vec<u8>),
}

impl RowValue {
    /// Render this value as an identifier string.
    ///
    /// Text, UTF-8 bytes and integers are representable as text. Null,
    /// empty text, floats and non-UTF-8 bytes are not.
    pub fn as_identifier(&self) -> Option<String> {
        match self {
            Self::Text(s) if !s.is_empty() => Some(s.clone()),
            Self::Bytes(b) => match std::str::from_utf8(b) {
                Ok(s) if !s.is_empty() => Some(s.to_string()),
                _ => None,
            },
            Self::Int(i) => Some(i.to_string()),
            Self::UInt(u) => Some(u.to_string()),
            _ => None,
        }
    }

    /// Convert to a JSON value for a search document.
    ///
    /// Binary values are decoded as UTF-8 text. Non-finite floats have no
    /// JSON representation and become null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Int(i) => serde_json::Value::from(*i),
            Self::UInt(u) => serde_json::Value::from(*u),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Bytes(b) => serde_json::Value::String(String::from_utf8_lossy(b).into_owned()),
        }
    }
}

impl From<&str> for RowValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for RowValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for RowValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<u64> for RowValue {
    fn from(u: u64) -> Self {
        Self::UInt(u)
    }
}

impl From<f64> for RowValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<Vec<u8>> for RowValue {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}
