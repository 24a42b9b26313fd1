//! Presence checks run over a raw request body.
//!
//! serde stops at the first missing field. These checks walk the untyped body
//! and name every absent required key, so a rejection can list all of them.

use serde_json::Value;

use crate::errors::{FieldViolation, LocSegment, ViolationKind};

pub trait RequiredFields {
    /// Violations for every required key absent from `body`, located under `loc`.
    fn missing_fields(body: &Value, loc: &[LocSegment]) -> Vec<FieldViolation>;
}

/// Reports each of `keys` absent from `body`. Non-object bodies report nothing;
/// their shape error comes from deserialization.
pub fn missing_keys(body: &Value, loc: &[LocSegment], keys: &[&str]) -> Vec<FieldViolation> {
    let Some(object) = body.as_object() else {
        return Vec::new();
    };

    keys.iter()
        .filter(|key| !object.contains_key(**key))
        .map(|key| {
            let mut path = loc.to_vec();
            path.push(LocSegment::from(*key));
            FieldViolation {
                loc: path,
                msg: format!("missing field `{key}`"),
                kind: ViolationKind::Missing,
            }
        })
        .collect()
}

/// Applies `T`'s checks to every element of the list stored under `key`.
pub fn missing_in_list<T: RequiredFields>(
    body: &Value,
    loc: &[LocSegment],
    key: &str,
) -> Vec<FieldViolation> {
    let Some(items) = body.get(key).and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .flat_map(|(index, item)| {
            let mut path = loc.to_vec();
            path.push(LocSegment::from(key));
            path.push(LocSegment::Index(index));
            T::missing_fields(item, &path)
        })
        .collect()
}
