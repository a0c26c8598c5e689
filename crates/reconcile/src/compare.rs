//! Structural comparison of desired and current state.
//!
//! Desired state is a partial document: only the keys the caller wrote are
//! checked, anything the appliance adds on its own (`uri`, `eTag`,
//! `created`, ...) is ignored.

use crate::descriptor::ResourceDescriptor;
use serde_json::Value;
use std::collections::BTreeSet;

/// Fields identifying list elements, in order of preference.
const IDENTIFIERS: [&str; 4] = ["uri", "id", "name", "key"];

/// Decides whether current state already satisfies desired state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Comparator {
    ordered: &'static [&'static str],
    /// `(path, key)` lists merged by key; the desired entries need only be present.
    additive: &'static [(&'static str, &'static str)],
    write_only: &'static [&'static str],
}

impl Comparator {
    /// Comparator honoring a descriptor's ordered paths and write-only fields.
    #[must_use]
    pub fn for_descriptor(descriptor: &'static ResourceDescriptor) -> Self {
        Self {
            ordered: descriptor.ordered_paths,
            additive: descriptor.additive_paths,
            write_only: descriptor.write_only,
        }
    }

    /// Whether `current` satisfies `desired`.
    #[must_use]
    pub fn matches(&self, desired: &Value, current: &Value) -> bool {
        self.equal("", desired, current)
    }

    fn equal(&self, path: &str, desired: &Value, current: &Value) -> bool {
        match (desired, current) {
            (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
            (Value::Array(desired), Value::Array(current)) => {
                self.sequences_equal(path, desired, current)
            }
            (Value::Object(desired), Value::Object(current)) => {
                desired.iter().all(|(key, wanted)| {
                    if path.is_empty() && self.write_only.contains(&key.as_str()) {
                        return true;
                    }
                    let child = join(path, key);
                    match current.get(key) {
                        Some(actual) => self.equal(&child, wanted, actual),
                        None => wanted.is_null(),
                    }
                })
            }
            (desired, current) => desired == current,
        }
    }

    fn sequences_equal(&self, path: &str, desired: &[Value], current: &[Value]) -> bool {
        if let Some((_, key)) = self.additive.iter().find(|(additive, _)| *additive == path) {
            return desired.iter().all(|wanted| {
                wanted.get(*key).is_some_and(|id| {
                    current
                        .iter()
                        .any(|actual| actual.get(*key) == Some(id) && self.equal(path, wanted, actual))
                })
            });
        }
        if desired.len() != current.len() {
            return false;
        }
        if self.ordered.contains(&path) {
            return in_order(self, path, desired, current);
        }
        match shared_identifier(desired) {
            Some(id) => {
                let mut used = vec![false; current.len()];
                desired.iter().all(|wanted| {
                    let found = current.iter().enumerate().position(|(index, actual)| {
                        !used[index]
                            && actual.get(id) == wanted.get(id)
                            && self.equal(path, wanted, actual)
                    });
                    match found {
                        Some(index) => {
                            used[index] = true;
                            true
                        }
                        None => false,
                    }
                })
            }
            None => in_order(self, path, desired, current),
        }
    }
}

fn in_order(comparator: &Comparator, path: &str, desired: &[Value], current: &[Value]) -> bool {
    desired
        .iter()
        .zip(current)
        .all(|(wanted, actual)| comparator.equal(path, wanted, actual))
}

fn numbers_equal(a: &serde_json::Number, b: &serde_json::Number) -> bool {
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        return a == b;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
        _ => a == b,
    }
}

/// First identifier field carried by every element, if all elements are mappings.
fn shared_identifier(items: &[Value]) -> Option<&'static str> {
    if items.is_empty() || !items.iter().all(Value::is_object) {
        return None;
    }
    IDENTIFIERS.into_iter().find(|id| {
        items
            .iter()
            .all(|item| item.get(*id).is_some_and(|value| !value.is_null()))
    })
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// Scope URIs carried by a resource.
#[must_use]
pub fn scope_set(resource: &Value) -> BTreeSet<String> {
    resource
        .get("scopeUris")
        .and_then(Value::as_array)
        .map(|uris| {
            uris.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Whether the resource's scopes equal `desired` as sets.
#[must_use]
pub fn scopes_match(resource: &Value, desired: &[String]) -> bool {
    scope_set(resource) == desired.iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plain() -> Comparator {
        Comparator::default()
    }

    #[test]
    fn test_current_only_keys_are_ignored() {
        let desired = json!({"name": "net1", "fabricType": "FabricAttach"});
        let current = json!({
            "name": "net1",
            "fabricType": "FabricAttach",
            "uri": "/rest/fc-networks/u1",
            "eTag": "1"
        });
        assert!(plain().matches(&desired, &current));
    }

    #[test]
    fn test_null_equals_absent() {
        let desired = json!({"name": "net1", "description": null});
        assert!(plain().matches(&desired, &json!({"name": "net1"})));
        assert!(!plain().matches(&desired, &json!({"name": "net1", "description": "x"})));
    }

    #[test]
    fn test_numbers_compare_numerically() {
        assert!(plain().matches(&json!({"port": 162}), &json!({"port": 162.0})));
        assert!(!plain().matches(&json!({"port": 162}), &json!({"port": "162"})));
    }

    #[test]
    fn test_strings_are_case_sensitive() {
        assert!(!plain().matches(&json!({"name": "Net1"}), &json!({"name": "net1"})));
    }

    #[test]
    fn test_keyed_lists_compare_as_multisets() {
        let desired = json!({"connections": [
            {"id": 2, "networkUri": "/rest/ethernet-networks/b"},
            {"id": 1, "networkUri": "/rest/ethernet-networks/a"}
        ]});
        let current = json!({"connections": [
            {"id": 1, "networkUri": "/rest/ethernet-networks/a", "mac": "00:11"},
            {"id": 2, "networkUri": "/rest/ethernet-networks/b", "mac": "00:12"}
        ]});
        assert!(plain().matches(&desired, &current));
    }

    #[test]
    fn test_plain_lists_compare_in_order() {
        let desired = json!({"networkUris": ["/a", "/b"]});
        assert!(plain().matches(&desired, &json!({"networkUris": ["/a", "/b"]})));
        assert!(!plain().matches(&desired, &json!({"networkUris": ["/b", "/a"]})));
        assert!(!plain().matches(&desired, &json!({"networkUris": ["/a"]})));
    }

    #[test]
    fn test_ordered_paths_respect_order() {
        static ORDERED: &[&str] = &["interconnectMapTemplate.interconnectMapEntryTemplates"];
        let comparator = Comparator {
            ordered: ORDERED,
            ..Comparator::default()
        };
        let desired = json!({"interconnectMapTemplate": {"interconnectMapEntryTemplates": [
            {"name": "bay1"}, {"name": "bay2"}
        ]}});
        let swapped = json!({"interconnectMapTemplate": {"interconnectMapEntryTemplates": [
            {"name": "bay2"}, {"name": "bay1"}
        ]}});
        assert!(!comparator.matches(&desired, &swapped));
        assert!(plain().matches(&desired, &swapped));
    }

    #[test]
    fn test_write_only_fields_are_skipped() {
        let comparator = Comparator {
            write_only: &["password"],
            ..Comparator::default()
        };
        let desired = json!({"name": "array", "password": "secret"});
        assert!(comparator.matches(&desired, &json!({"name": "array"})));
    }

    #[test]
    fn test_additive_lists_need_only_desired_entries() {
        let comparator = Comparator {
            additive: &[("customAttributes", "key")],
            ..Comparator::default()
        };
        let current = json!({"customAttributes": [
            {"key": "SSH_CERT", "values": [{"scope": "server", "value": "abc"}]},
            {"key": "OWNER", "values": [{"scope": "server", "value": "ops"}]}
        ]});
        let present = json!({"customAttributes": [
            {"key": "OWNER", "values": [{"scope": "server", "value": "ops"}]}
        ]});
        let changed = json!({"customAttributes": [
            {"key": "OWNER", "values": [{"scope": "server", "value": "dev"}]}
        ]});
        assert!(comparator.matches(&present, &current));
        assert!(!comparator.matches(&changed, &current));
    }

    #[test]
    fn test_scopes_compare_as_sets() {
        let resource = json!({"scopeUris": ["/rest/scopes/b", "/rest/scopes/a"]});
        assert!(scopes_match(
            &resource,
            &["/rest/scopes/a".to_string(), "/rest/scopes/b".to_string()]
        ));
        assert!(!scopes_match(&resource, &["/rest/scopes/a".to_string()]));
        assert!(scopes_match(&json!({}), &[]));
    }
}
