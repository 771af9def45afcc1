//! Cell values in their wire encoding.
//!
//! Primitive values travel as plain JSON. Everything else is a JSON array whose first
//! element is a one-letter type tag, e.g. `["L", 1, 2]` for a reference list or
//! `["d", 1700000000]` for a date. The tag is checked on decode instead of being trusted.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::domain::RowId;

/// Type tag of list and reference-list values.
pub const LIST_TAG: &str = "L";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("encoded value is missing its type tag")]
    MissingTypeTag,
    #[error("unsupported cell value: {0}")]
    Unsupported(String),
    #[error("expected a reference list, got {0}")]
    ExpectedList(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// A list value (tag `L`); reference lists hold row ids as `Int`s.
    List(Vec<CellValue>),
    /// Any other tagged value, kept opaque.
    Encoded { tag: String, args: Vec<Value> },
}

impl CellValue {
    pub fn from_wire(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(CellValue::Null),
            Value::Bool(b) => Ok(CellValue::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(CellValue::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(CellValue::Float(f))
                } else {
                    Err(ValueError::Unsupported(n.to_string()))
                }
            }
            Value::String(s) => Ok(CellValue::Text(s.clone())),
            Value::Array(items) => {
                let Some((tag, rest)) = items.split_first() else {
                    return Err(ValueError::MissingTypeTag);
                };
                let tag = match tag {
                    Value::String(tag) if !tag.is_empty() => tag,
                    _ => return Err(ValueError::MissingTypeTag),
                };
                if tag == LIST_TAG {
                    let items = rest
                        .iter()
                        .map(CellValue::from_wire)
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(CellValue::List(items))
                } else {
                    Ok(CellValue::Encoded {
                        tag: tag.clone(),
                        args: rest.to_vec(),
                    })
                }
            }
            Value::Object(_) => Err(ValueError::Unsupported(value.to_string())),
        }
    }

    pub fn to_wire(&self) -> Value {
        match self {
            CellValue::Null => Value::Null,
            CellValue::Bool(b) => Value::Bool(*b),
            CellValue::Int(i) => Value::from(*i),
            CellValue::Float(f) => Value::from(*f),
            CellValue::Text(s) => Value::String(s.clone()),
            CellValue::List(items) => {
                let mut encoded = Vec::with_capacity(items.len() + 1);
                encoded.push(Value::String(LIST_TAG.to_string()));
                encoded.extend(items.iter().map(CellValue::to_wire));
                Value::Array(encoded)
            }
            CellValue::Encoded { tag, args } => {
                let mut encoded = Vec::with_capacity(args.len() + 1);
                encoded.push(Value::String(tag.clone()));
                encoded.extend(args.iter().cloned());
                Value::Array(encoded)
            }
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, CellValue::List(_))
    }

    /// A usable row id: a strictly positive integer.
    pub fn as_row_id(&self) -> Option<RowId> {
        match self {
            CellValue::Int(i) if *i > 0 => Some(RowId(*i)),
            CellValue::Float(f) if f.fract() == 0.0 && *f > 0.0 => Some(RowId(*f as i64)),
            _ => None,
        }
    }

    /// Values to filter by: list elements, or the value alone.
    pub fn filter_values(&self) -> Vec<CellValue> {
        match self {
            CellValue::List(items) => items.clone(),
            other => vec![other.clone()],
        }
    }

    /// Reads a reference-list cell; an empty cell is an empty list.
    pub fn into_ref_list(self) -> Result<CellValue, ValueError> {
        match self {
            CellValue::Null => Ok(CellValue::List(Vec::new())),
            value if value.is_list() => Ok(value),
            other => Err(ValueError::ExpectedList(other.to_wire().to_string())),
        }
    }

    pub fn ref_list_ids(&self) -> Vec<RowId> {
        match self {
            CellValue::List(items) => items.iter().filter_map(CellValue::as_row_id).collect(),
            _ => Vec::new(),
        }
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        CellValue::from_wire(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "tests/value_tests.rs"]
mod tests;
