//! Report entries and the helpers used to fill them.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value, json};

use std::cell::RefCell;
use std::rc::Rc;

/// Placeholder substituted for the probe's real IP address.
pub const REDACTED: &str = "[REDACTED]";

/// A measurement record shared between a caller and its in-flight probes.
///
/// Clones refer to the same underlying JSON object. Probes only ever
/// add to it: they set scalar fields and append to array fields such as
/// `queries` and `requests`, in completion order. All mutation happens on
/// the reactor thread, hence no locking.
#[derive(Clone, Debug, Default)]
pub struct ReportEntry {
    fields: Rc<RefCell<Map<String, Value>>>,
}

impl ReportEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing any previous value.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.fields.borrow_mut().insert(key.to_owned(), value.into());
    }

    /// Appends `value` to the array stored under `key`.
    ///
    /// A missing or `null` field becomes a one-element array. Any other
    /// non-array value is wrapped so that nothing already recorded is lost.
    pub fn append(&self, key: &str, value: impl Into<Value>) {
        let mut fields = self.fields.borrow_mut();
        let slot = fields.entry(key.to_owned()).or_insert(Value::Null);

        if slot.is_null() {
            *slot = Value::Array(Vec::new());
        } else if !slot.is_array() {
            let previous = slot.take();
            *slot = Value::Array(vec![previous]);
        }

        if let Value::Array(items) = slot {
            items.push(value.into());
        }
    }

    /// Returns a copy of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.fields.borrow().get(key).cloned()
    }

    /// Returns a snapshot of the whole entry.
    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.borrow().clone())
    }
}

/// Represents raw bytes for embedding into a report.
///
/// Valid UTF-8 is stored as a plain string; anything else is stored as
/// `{"format": "base64", "data": ...}` so the report stays valid JSON
/// without losing bytes.
pub fn represent_string(bytes: &[u8]) -> Value {
    match std::str::from_utf8(bytes) {
        Ok(s) => Value::String(s.to_owned()),
        Err(_) => json!({
            "format": "base64",
            "data": STANDARD.encode(bytes),
        }),
    }
}

/// Replaces every occurrence of `secret` in `bytes` with [`REDACTED`].
///
/// Works on raw bytes so it can run before [`represent_string`]: the
/// secret has to be removed before any escaping or encoding, which would
/// otherwise hide it from the search.
pub fn redact(bytes: &[u8], secret: &str) -> Vec<u8> {
    let secret = secret.as_bytes();

    if secret.is_empty() || bytes.len() < secret.len() {
        return bytes.to_vec();
    }

    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i..].starts_with(secret) {
            out.extend_from_slice(REDACTED.as_bytes());
            i += secret.len();
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    out
}
