//! Collection queries and patch operations.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Query parameters accepted by appliance collection endpoints.
///
/// `start`, `count`, `filter`, `sort`, `query`, `fields` and `view` are
/// passed through verbatim. When `count` is unset the client follows
/// `nextPageUri` until the collection is exhausted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    /// Index of the first member to return.
    pub start: Option<u32>,
    /// Maximum number of members to return.
    pub count: Option<u32>,
    /// Filter expressions, ANDed by the appliance.
    #[serde(deserialize_with = "one_or_many")]
    pub filter: Vec<String>,
    /// Sort expression, e.g. `name:ascending`.
    pub sort: Option<String>,
    /// Free-form query expression.
    pub query: Option<String>,
    /// Comma-separated field projection.
    pub fields: Option<String>,
    /// Named view.
    pub view: Option<String>,
    /// Restrict results to resources in these scopes.
    #[serde(alias = "scopeUris")]
    pub scope_uris: Option<String>,
    /// Any other parameter (`refresh`, `startDate`, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(filter)) => vec![filter],
        Some(OneOrMany::Many(filters)) => filters,
    })
}

impl Query {
    /// Create an empty query (appliance defaults).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Query matching a single field value, in the appliance filter syntax.
    #[must_use]
    pub fn by_field(field: &str, value: &str) -> Self {
        Self::new().filter(format!("\"{field}='{value}'\""))
    }

    /// Parse a parameter mapping supplied by a caller.
    pub fn from_params(params: &Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(params.clone()))
            .map_err(|e| Error::Other(format!("invalid query parameters: {e}")))
    }

    /// Add a filter expression.
    #[must_use]
    pub fn filter(mut self, expression: impl Into<String>) -> Self {
        self.filter.push(expression.into());
        self
    }

    /// Set the sort expression.
    #[must_use]
    pub fn sort(mut self, expression: impl Into<String>) -> Self {
        self.sort = Some(expression.into());
        self
    }

    /// Set the page window.
    #[must_use]
    pub fn page(mut self, start: u32, count: u32) -> Self {
        self.start = Some(start);
        self.count = Some(count);
        self
    }

    /// Whether the caller asked for one page rather than the whole collection.
    #[must_use]
    pub fn is_paged(&self) -> bool {
        self.count.is_some()
    }

    /// Render as URL query pairs, in a stable order.
    #[must_use]
    pub fn pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(start) = self.start {
            pairs.push(("start".to_string(), start.to_string()));
        }
        if let Some(count) = self.count {
            pairs.push(("count".to_string(), count.to_string()));
        }
        for filter in &self.filter {
            pairs.push(("filter".to_string(), filter.clone()));
        }
        let optional = [
            ("sort", &self.sort),
            ("query", &self.query),
            ("fields", &self.fields),
            ("view", &self.view),
            ("scopeUris", &self.scope_uris),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                pairs.push((key.to_string(), value.clone()));
            }
        }
        for (key, value) in &self.extra {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Null => continue,
                other => other.to_string(),
            };
            pairs.push((key.clone(), rendered));
        }
        pairs
    }
}

/// A single JSON-patch style operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOp {
    /// `replace`, `add` or `remove`.
    pub op: String,
    /// Slash-separated path, e.g. `/scopeUris`.
    pub path: String,
    /// New value (ignored by `remove`).
    #[serde(default)]
    pub value: Value,
}

impl PatchOp {
    /// A `replace` operation.
    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: "replace".to_string(),
            path: path.into(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_by_field_uses_quoted_filter() {
        let query = Query::by_field("name", "net1");
        assert_eq!(query.filter, vec!["\"name='net1'\"".to_string()]);
        assert!(!query.is_paged());
    }

    #[test]
    fn test_from_params_accepts_single_filter() {
        let params = json!({"start": 0, "count": 3, "filter": "status='OK'", "sort": "name:ascending"});
        let query = Query::from_params(params.as_object().unwrap()).unwrap();
        assert_eq!(query.start, Some(0));
        assert_eq!(query.count, Some(3));
        assert_eq!(query.filter, vec!["status='OK'".to_string()]);
        assert!(query.is_paged());
    }

    #[test]
    fn test_from_params_keeps_extra_parameters() {
        let params = json!({"fields": "AveragePower", "refresh": true, "scope_uris": "/rest/scopes/a"});
        let query = Query::from_params(params.as_object().unwrap()).unwrap();
        let pairs = query.pairs();
        assert!(pairs.contains(&("fields".to_string(), "AveragePower".to_string())));
        assert!(pairs.contains(&("refresh".to_string(), "true".to_string())));
        assert!(pairs.contains(&("scopeUris".to_string(), "/rest/scopes/a".to_string())));
    }

    #[test]
    fn test_from_params_rejects_bad_types() {
        let params = json!({"count": "many"});
        assert!(Query::from_params(params.as_object().unwrap()).is_err());
    }

    #[test]
    fn test_patch_replace_serializes() {
        let op = PatchOp::replace("/scopeUris", json!(["/rest/scopes/a"]));
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({"op": "replace", "path": "/scopeUris", "value": ["/rest/scopes/a"]})
        );
    }
}
