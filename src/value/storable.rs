//! Typed row payloads
//!
//! Table handles are generic over a `Storable` row type. `Value` itself is
//! storable, and so is `serde_json::Value`. Any serde type can be stored by
//! wrapping it in [`Json`].

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use super::types::Value;

/// A row payload could not be converted to or from the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {found} row payload: {reason}")]
pub struct ConversionError {
    pub found: &'static str,
    pub reason: String,
}

/// Conversion between a typed row and the storable `Value`.
pub trait Storable: Sized {
    fn into_value(self) -> Result<Value, ConversionError>;
    fn from_value(value: Value) -> Result<Self, ConversionError>;
}

impl Storable for Value {
    fn into_value(self) -> Result<Value, ConversionError> {
        Ok(self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        Ok(value)
    }
}

impl Storable for serde_json::Value {
    fn into_value(self) -> Result<Value, ConversionError> {
        Ok(Value::from(self))
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        Ok(serde_json::Value::from(value))
    }
}

/// Stores any serde type through its JSON shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

impl<T: Serialize + DeserializeOwned> Storable for Json<T> {
    fn into_value(self) -> Result<Value, ConversionError> {
        serde_json::to_value(&self.0)
            .map(Value::from)
            .map_err(|e| ConversionError {
                found: std::any::type_name::<T>(),
                reason: e.to_string(),
            })
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        let found = value.type_name();
        serde_json::from_value(serde_json::Value::from(value))
            .map(Json)
            .map_err(|e| ConversionError {
                found,
                reason: e.to_string(),
            })
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => {
                Value::Map(fields.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// Lossy in two places: bytes become an array of numbers and timestamps an
/// RFC 3339 string. Non-finite numbers become null.
impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Number(n) => number_to_json(n),
            Value::String(s) => serde_json::Value::String(s),
            Value::Bytes(b) => {
                serde_json::Value::Array(b.into_iter().map(serde_json::Value::from).collect())
            }
            Value::List(items) => {
                serde_json::Value::Array(items.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Map(fields) => serde_json::Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
            Value::Timestamp(t) => serde_json::Value::String(timestamp_to_string(&t)),
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    // Integral values print as integers so payloads read naturally.
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

fn timestamp_to_string(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)
}
