//! Probe settings.
//!
//! Settings are a flat, string-keyed map of loosely typed values, copied
//! into every probe. Lookups are typed and fallible: a missing key or a
//! value of the wrong shape is reported as an [`Error`], never a panic.
//!
//! Values coming from text sources are coerced where unambiguous, so
//! `"80"` reads as an integer and `"true"` as a boolean.

use crate::error::{Error, Result};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single setting value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self {
        Value::Int(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

/// Conversion out of a [`Value`], used by [`Settings::get`].
pub trait FromValue: Sized {
    /// Human-readable name of the target type, for error messages.
    const EXPECTED: &'static str;

    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for String {
    const EXPECTED: &'static str = "string";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl FromValue for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Int(0) => Some(false),
            Value::Int(1) => Some(true),
            Value::Str(s) => match s.as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(n) => Some(*n),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FromValue for u16 {
    const EXPECTED: &'static str = "port number";

    fn from_value(value: &Value) -> Option<Self> {
        i64::from_value(value).and_then(|n| u16::try_from(n).ok())
    }
}

impl FromValue for u32 {
    const EXPECTED: &'static str = "unsigned integer";

    fn from_value(value: &Value) -> Option<Self> {
        i64::from_value(value).and_then(|n| u32::try_from(n).ok())
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "number";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// A snapshot of probe settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    values: BTreeMap<String, Value>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads settings from a flat JSON object.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Reads `key` as a `T`.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingSetting`] if the key is absent.
    /// - [`Error::InvalidSetting`] if the value cannot be read as a `T`.
    pub fn get<T: FromValue>(&self, key: &str) -> Result<T> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| Error::MissingSetting(key.to_owned()))?;

        T::from_value(value).ok_or_else(|| Error::InvalidSetting {
            key: key.to_owned(),
            expected: T::EXPECTED,
        })
    }

    /// Reads `key` as a `T`, falling back to `default` on any error.
    pub fn get_or<T: FromValue>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }
}
