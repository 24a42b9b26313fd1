//! Non-null field filtering applied before any payload leaves the service.
//!
//! Optional fields the caller did not supply serialize as JSON `null`;
//! [`present_fields`] drops those keys so downstream systems only see values
//! that were actually provided. Explicit `false`, `0`, `""` and empty lists
//! are values and are kept.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Insertion-ordered string-keyed map of untyped JSON values.
pub type FieldMap = Map<String, Value>;

/// Open mappings whose contents are forwarded verbatim.
const PASSTHROUGH_KEYS: &[&str] = &["metadata", "raw"];

#[derive(Debug, Error)]
pub enum FieldsError {
    #[error("payload could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("payload did not serialize to a JSON object")]
    NotAnObject,
}

pub fn present_fields<T>(value: &T) -> Result<FieldMap, FieldsError>
where
    T: Serialize + ?Sized,
{
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(prune_object(map)),
        _ => Err(FieldsError::NotAnObject),
    }
}

fn prune_object(map: FieldMap) -> FieldMap {
    map.into_iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| {
            if PASSTHROUGH_KEYS.contains(&key.as_str()) {
                (key, value)
            } else {
                (key, prune_value(value))
            }
        })
        .collect()
}

fn prune_value(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(prune_object(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(prune_value).collect()),
        other => other,
    }
}
