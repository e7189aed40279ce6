//! Best-effort field decoding
//!
//! i3 and sway disagree on a handful of optional fields, and both have changed
//! field types between releases. A record is therefore decoded one field at a
//! time: a field whose JSON type does not match keeps its default value and is
//! recorded as a [`FieldMismatch`]. What happens to the recorded mismatches is
//! decided by the [`DecodePolicy`] once the whole reply has been walked.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::IpcError;

/// How type mismatches inside reply records are treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Keep the partially populated value and drop the mismatches
    #[default]
    Lenient,
    /// Fail with [`IpcError::TypeMismatch`] on the first mismatch
    Strict,
}

/// A field that could not be decoded into its declared type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMismatch {
    /// Location in the reply, e.g. `nodes[0].rect.width`
    pub path: String,
    /// serde's description of the mismatch
    pub message: String,
}

/// Types decoded field by field rather than through serde derive
pub(crate) trait DecodeLenient: Sized + Default {
    /// Decode from an object value; called only for JSON objects
    fn decode_fields(fields: &mut Fields<'_>) -> Self;

    /// Decode from any value, recording a mismatch if it is not an object
    fn decode_lenient(value: &Value, path: &str, mismatches: &mut Vec<FieldMismatch>) -> Self {
        match value.as_object() {
            Some(object) => Self::decode_fields(&mut Fields::new(object, path, mismatches)),
            None => {
                mismatches.push(FieldMismatch {
                    path: path.to_string(),
                    message: format!("expected object, found {}", json_kind(value)),
                });
                Self::default()
            }
        }
    }
}

/// Cursor over the fields of one JSON object
pub(crate) struct Fields<'a> {
    object: &'a Map<String, Value>,
    path: &'a str,
    mismatches: &'a mut Vec<FieldMismatch>,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(
        object: &'a Map<String, Value>,
        path: &'a str,
        mismatches: &'a mut Vec<FieldMismatch>,
    ) -> Self {
        Self {
            object,
            path,
            mismatches,
        }
    }

    /// Field value, or the type's default when absent, null or mismatched
    pub(crate) fn get<T: DeserializeOwned + Default>(&mut self, key: &str) -> T {
        self.optional(key).unwrap_or_default()
    }

    /// Field value, or `None` when absent, null or mismatched
    pub(crate) fn optional<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let value = self.raw(key)?;
        match T::deserialize(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                self.record(key, e.to_string());
                None
            }
        }
    }

    /// Nested record decoded with its own lenient rules
    pub(crate) fn nested<T: DecodeLenient>(&mut self, key: &str) -> T {
        match self.raw(key) {
            Some(value) => {
                let path = self.path_of(key);
                T::decode_lenient(value, &path, &mut *self.mismatches)
            }
            None => T::default(),
        }
    }

    /// Raw field value, treating null as absent
    pub(crate) fn raw(&self, key: &str) -> Option<&'a Value> {
        self.object.get(key).filter(|value| !value.is_null())
    }

    /// Record a mismatch for `key`
    pub(crate) fn record(&mut self, key: &str, message: String) {
        let path = self.path_of(key);
        self.mismatches.push(FieldMismatch { path, message });
    }

    pub(crate) fn path_of(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    pub(crate) fn mismatches(&mut self) -> &mut Vec<FieldMismatch> {
        &mut *self.mismatches
    }
}

/// Decode an array of records, skipping elements that are not objects
pub(crate) fn decode_list<T: DecodeLenient>(
    items: &[Value],
    path: &str,
    mismatches: &mut Vec<FieldMismatch>,
) -> Vec<T> {
    let mut decoded = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{}[{}]", path, i);
        if item.is_object() {
            decoded.push(T::decode_lenient(item, &item_path, mismatches));
        } else {
            mismatches.push(FieldMismatch {
                path: item_path,
                message: format!("expected object, found {}", json_kind(item)),
            });
        }
    }
    decoded
}

/// Apply `policy` to the mismatches collected while decoding `value`
pub(crate) fn settle<T>(
    value: T,
    mismatches: Vec<FieldMismatch>,
    policy: DecodePolicy,
    reply: &str,
) -> Result<T, IpcError> {
    match policy {
        DecodePolicy::Strict => match mismatches.into_iter().next() {
            Some(first) => Err(IpcError::TypeMismatch {
                path: first.path,
                message: first.message,
            }),
            None => Ok(value),
        },
        DecodePolicy::Lenient => {
            for mismatch in &mismatches {
                debug!(
                    reply,
                    path = %mismatch.path,
                    error = %mismatch.message,
                    "Ignoring field type mismatch"
                );
            }
            Ok(value)
        }
    }
}

/// Short JSON type name for error messages
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
