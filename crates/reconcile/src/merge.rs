//! Building submission bodies from current and desired state.

use crate::descriptor::ResourceDescriptor;
use serde_json::{Map, Value};

/// Recursive right-biased overlay of `desired` onto `current`.
///
/// Mappings merge key by key; lists and scalars from `desired` replace
/// those in `current`, except lists at one of the `additive` paths, which
/// merge by the paired key. An explicit `null` in `desired` is kept so the
/// appliance clears the field.
#[must_use]
pub fn merge(current: &Value, desired: &Value, additive: &[(&str, &str)]) -> Value {
    merge_at("", current, desired, additive)
}

fn merge_at(path: &str, current: &Value, desired: &Value, additive: &[(&str, &str)]) -> Value {
    match (current, desired) {
        (Value::Object(current), Value::Object(desired)) => {
            let mut merged = current.clone();
            for (key, wanted) in desired {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                let value = match current.get(key) {
                    Some(existing) => merge_at(&child, existing, wanted, additive),
                    None => wanted.clone(),
                };
                merged.insert(key.clone(), value);
            }
            Value::Object(merged)
        }
        (Value::Array(current), Value::Array(desired)) => {
            match additive.iter().find(|(additive_path, _)| *additive_path == path) {
                Some((_, key)) => Value::Array(merge_list_by_key(current, desired, key)),
                None => Value::Array(desired.clone()),
            }
        }
        (_, desired) => desired.clone(),
    }
}

/// Merge two lists of mappings by `key`.
///
/// Entries of `updated` override same-keyed entries of `original` (merged
/// field by field); other entries of `original` are kept in place and new
/// ones are appended.
#[must_use]
pub fn merge_list_by_key(original: &[Value], updated: &[Value], key: &str) -> Vec<Value> {
    let mut merged: Vec<Value> = original.to_vec();
    for entry in updated {
        let id = entry.get(key);
        match merged
            .iter_mut()
            .find(|existing| id.is_some() && existing.get(key) == id)
        {
            Some(existing) => *existing = merge(existing, entry, &[]),
            None => merged.push(entry.clone()),
        }
    }
    merged
}

/// Desired state with `newName` turned into the natural key.
#[must_use]
pub fn normalize(desired: &Map<String, Value>, natural_key: &str) -> Map<String, Value> {
    let mut normalized = desired.clone();
    if let Some(new_name) = normalized.remove("newName") {
        normalized.insert(natural_key.to_string(), new_name);
    }
    normalized
}

/// Body to submit for `desired` over `current` (`Null` for creates).
///
/// Write-only fields the caller did not supply are dropped so an update
/// never has to re-send secrets.
#[must_use]
pub fn prepare_body(
    current: &Value,
    desired: &Map<String, Value>,
    descriptor: &ResourceDescriptor,
) -> Value {
    let desired = normalize(desired, descriptor.natural_key);
    let base = match current {
        Value::Object(_) => current.clone(),
        _ => Value::Object(Map::new()),
    };
    let mut body = merge(&base, &Value::Object(desired.clone()), descriptor.additive_paths);
    if let Value::Object(fields) = &mut body {
        for field in descriptor.write_only {
            if !desired.contains_key(*field) {
                fields.remove(*field);
            }
        }
    }
    body
}
