//! Name-to-URI resolution.

use crate::descriptor::{Lookup, ReferenceField};
use crate::error::{Error, Result};
use crate::message::MessageCode;
use appliance::Appliance;
use serde_json::{Map, Value};

/// A logical reference to a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// Canonical URI, used as is.
    Uri(String),
    /// Natural-key value, e.g. a name.
    Key(String),
}

impl Reference {
    /// Reference carried by a desired-state document: `uri` wins over `key`.
    #[must_use]
    pub fn from_data(data: &Map<String, Value>, key: &str) -> Option<Self> {
        if let Some(uri) = data.get("uri").and_then(Value::as_str) {
            return Some(Self::Uri(uri.to_string()));
        }
        data.get(key).and_then(Value::as_str).map(|value| Self::Key(value.to_string()))
    }

    /// Reference from top-level `name`/`uri` shorthands.
    #[must_use]
    pub fn from_parts(name: Option<&str>, uri: Option<&str>) -> Option<Self> {
        match (uri, name) {
            (Some(uri), _) => Some(Self::Uri(uri.to_string())),
            (None, Some(name)) => Some(Self::Key(name.to_string())),
            (None, None) => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Uri(value) | Self::Key(value) => value,
        }
    }
}

/// Resolves references through natural-key queries.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    appliance: &'a dyn Appliance,
}

impl<'a> Resolver<'a> {
    pub fn new(appliance: &'a dyn Appliance) -> Self {
        Self { appliance }
    }

    /// The single member whose `lookup.key` equals `value`, if any.
    ///
    /// More than one match is an error; the engine never picks one.
    pub fn find(&self, lookup: &Lookup, value: &str) -> Result<Option<Value>> {
        let mut members = self.appliance.find_by(lookup.collection, lookup.key, value)?;
        match members.len() {
            0 => Ok(None),
            1 => Ok(members.pop()),
            count => Err(Error::Ambiguous {
                kind: lookup.kind.to_string(),
                reference: value.to_string(),
                count,
            }),
        }
    }

    /// Fetch the resource a reference points at.
    pub fn fetch(&self, lookup: &Lookup, reference: &Reference) -> Result<Option<Value>> {
        match reference {
            Reference::Uri(uri) => Ok(self.appliance.get(uri)?),
            Reference::Key(value) => self.find(lookup, value),
        }
    }

    /// URI a reference points at; a URI passes through untouched.
    pub fn resolve_uri(&self, lookup: &Lookup, reference: &Reference) -> Result<String> {
        self.resolve(lookup, reference, "uri", MessageCode::ResourceNotFound)
    }

    fn resolve(
        &self,
        lookup: &Lookup,
        reference: &Reference,
        yields: &str,
        missing: MessageCode,
    ) -> Result<String> {
        let value = match reference {
            Reference::Uri(uri) if yields == "uri" => return Ok(uri.clone()),
            Reference::Uri(uri) => uri,
            Reference::Key(value) => value,
        };
        let member = self.find(lookup, value)?.ok_or_else(|| Error::NotFound {
            kind: lookup.kind.to_string(),
            reference: value.clone(),
            code: missing,
        })?;
        member
            .get(yields)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::Value(format!("{} '{value}' has no {yields}", lookup.kind)))
    }

    /// Replace every name-reference field in `data` with its resolved value.
    ///
    /// Walks nested mappings and lists, so references inside e.g.
    /// `interconnectMapEntryTemplates` are translated too.
    pub fn resolve_fields(
        &self,
        fields: &[ReferenceField],
        data: &Map<String, Value>,
    ) -> Result<Map<String, Value>> {
        if fields.is_empty() {
            return Ok(data.clone());
        }
        match self.resolve_value(fields, &Value::Object(data.clone()))? {
            Value::Object(resolved) => Ok(resolved),
            _ => Ok(data.clone()),
        }
    }

    fn resolve_value(&self, fields: &[ReferenceField], value: &Value) -> Result<Value> {
        match value {
            Value::Object(map) => {
                let mut resolved = Map::new();
                for (key, item) in map {
                    let reference = fields.iter().find(|field| field.field == key);
                    match (reference, item) {
                        (Some(field), Value::String(name)) => {
                            log::debug!("Resolving {} '{name}' to {}", field.field, field.target);
                            let target = self.resolve(
                                &field.lookup,
                                &Reference::Key(name.clone()),
                                field.yields,
                                field.missing,
                            )?;
                            resolved.insert(field.target.to_string(), Value::String(target));
                        }
                        (Some(_), Value::Null) => {}
                        _ => {
                            resolved.insert(key.clone(), self.resolve_value(fields, item)?);
                        }
                    }
                }
                Ok(Value::Object(resolved))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve_value(fields, item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appliance::MemoryAppliance;
    use serde_json::json;

    const GROUPS: Lookup = Lookup::new("/rest/enclosure-groups", "Enclosure Group");
    const USERS: Lookup =
        Lookup::new("/rest/appliance/snmpv3-trap-forwarding/users", "SNMPv3 User").by("userName");

    #[test]
    fn test_uri_passes_through_without_lookup() {
        let appliance = MemoryAppliance::new();
        let resolver = Resolver::new(&appliance);
        let uri = resolver
            .resolve_uri(&GROUPS, &Reference::Uri("/rest/enclosure-groups/9".into()))
            .unwrap();
        assert_eq!(uri, "/rest/enclosure-groups/9");
        assert!(appliance.calls().is_empty());
    }

    #[test]
    fn test_name_resolves_to_uri() {
        let appliance = MemoryAppliance::new();
        let group = appliance.insert("/rest/enclosure-groups", json!({"name": "eg1"}));
        let resolver = Resolver::new(&appliance);
        let uri = resolver
            .resolve_uri(&GROUPS, &Reference::Key("eg1".into()))
            .unwrap();
        assert_eq!(json!(uri), group["uri"]);
    }

    #[test]
    fn test_missing_name_is_not_found() {
        let appliance = MemoryAppliance::new();
        let resolver = Resolver::new(&appliance);
        let err = resolver
            .resolve_uri(&GROUPS, &Reference::Key("eg1".into()))
            .unwrap_err();
        assert_eq!(err.code(), MessageCode::ResourceNotFound);
    }

    #[test]
    fn test_duplicate_names_are_ambiguous() {
        let appliance = MemoryAppliance::new();
        appliance.insert("/rest/enclosure-groups", json!({"name": "eg1"}));
        appliance.insert("/rest/enclosure-groups", json!({"name": "eg1"}));
        let resolver = Resolver::new(&appliance);
        let err = resolver.find(&GROUPS, "eg1").unwrap_err();
        assert_eq!(err.code(), MessageCode::AmbiguousReference);
    }

    #[test]
    fn test_resolve_fields_walks_nested_lists() {
        let appliance = MemoryAppliance::new();
        let group = appliance.insert("/rest/enclosure-groups", json!({"name": "eg1"}));
        let fields = [ReferenceField::new("enclosureGroupName", "enclosureGroupUri", GROUPS)];
        let data = json!({
            "name": "profile",
            "members": [{"enclosureGroupName": "eg1", "bay": 1}]
        });
        let resolved = Resolver::new(&appliance)
            .resolve_fields(&fields, data.as_object().unwrap())
            .unwrap();
        assert_eq!(resolved["members"][0]["enclosureGroupUri"], group["uri"]);
        assert!(resolved["members"][0].get("enclosureGroupName").is_none());
        assert_eq!(resolved["members"][0]["bay"], json!(1));
    }

    #[test]
    fn test_resolve_fields_yields_id_with_specific_code() {
        let appliance = MemoryAppliance::new();
        appliance.insert(USERS.collection, json!({"userName": "u1", "id": "u-1"}));
        let fields = [ReferenceField::new("userName", "userId", USERS)
            .yields("id")
            .missing(MessageCode::UserNotFound)];
        let resolver = Resolver::new(&appliance);

        let data = json!({"destinationAddress": "10.0.0.1", "userName": "u1"});
        let resolved = resolver.resolve_fields(&fields, data.as_object().unwrap()).unwrap();
        assert_eq!(resolved["userId"], json!("u-1"));
        assert!(resolved.get("userName").is_none());

        let unknown = json!({"destinationAddress": "10.0.0.1", "userName": "nobody"});
        let err = resolver
            .resolve_fields(&fields, unknown.as_object().unwrap())
            .unwrap_err();
        assert_eq!(err.code(), MessageCode::UserNotFound);
    }
}
