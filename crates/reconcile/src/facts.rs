//! Read-only fact gathering.
//!
//! The dual of the engine: list a kind, fetch one resource by name or URI,
//! then optionally pull named sub-facts declared in the descriptor's option
//! table. Never mutates.

use crate::descriptor::{Fetch, OptionSpec, ResourceDescriptor};
use crate::error::{Error, Result};
use crate::message::MessageCode;
use crate::record::ResultRecord;
use crate::resolve::{Reference, Resolver};
use appliance::{Appliance, Query};
use serde_json::{Map, Value};

/// An option requested by the caller, validated against the option table.
#[derive(Debug, Clone)]
pub struct RequestedOption {
    pub spec: &'static OptionSpec,
    /// Sub-parameters, e.g. `{fields: AveragePower}` for `utilization`.
    pub params: Map<String, Value>,
}

/// Gathers facts for one kind.
pub struct FactsGatherer<'a> {
    appliance: &'a dyn Appliance,
    descriptor: &'static ResourceDescriptor,
    resolver: Resolver<'a>,
}

impl<'a> FactsGatherer<'a> {
    pub fn new(appliance: &'a dyn Appliance, descriptor: &'static ResourceDescriptor) -> Self {
        Self {
            appliance,
            descriptor,
            resolver: Resolver::new(appliance),
        }
    }

    /// Validate an `options` value: a list of names and single-key mappings,
    /// e.g. `["script", {"utilization": {"fields": "AveragePower"}}]`.
    pub fn parse_options(&self, raw: &Value) -> Result<Vec<RequestedOption>> {
        let items = match raw {
            Value::Null => return Ok(Vec::new()),
            Value::Array(items) => items.as_slice(),
            single => std::slice::from_ref(single),
        };

        let mut requested = Vec::new();
        for item in items {
            match item {
                Value::String(name) => requested.push(self.option(name, Map::new())?),
                Value::Object(map) => {
                    for (name, params) in map {
                        let params = match params {
                            Value::Object(params) => params.clone(),
                            Value::Null | Value::Bool(true) => Map::new(),
                            other => {
                                return Err(Error::Value(format!(
                                    "parameters of option '{name}' must be a mapping, got {other}"
                                )));
                            }
                        };
                        requested.push(self.option(name, params)?);
                    }
                }
                other => {
                    return Err(Error::Value(format!("invalid option {other}")));
                }
            }
        }
        Ok(requested)
    }

    fn option(&self, name: &str, params: Map<String, Value>) -> Result<RequestedOption> {
        let spec = self.descriptor.option(name).ok_or_else(|| {
            let known: Vec<&str> = self.descriptor.options.iter().map(|o| o.name).collect();
            Error::Value(format!(
                "unknown option '{name}' for {}; known options: {}",
                self.descriptor.display,
                if known.is_empty() {
                    "none".to_string()
                } else {
                    known.join(", ")
                }
            ))
        })?;
        Ok(RequestedOption { spec, params })
    }

    /// Every resource of the kind matching `query`.
    pub fn list(&self, query: &Query) -> Result<ResultRecord> {
        let members = self.appliance.get_all(self.descriptor.path, query)?;
        log::debug!("{} {} found", members.len(), self.descriptor.facts_name);
        Ok(self.record().fact(self.descriptor.facts_name, Value::Array(members)))
    }

    /// The resource matched by `reference`, as a list of zero or one.
    pub fn get(&self, reference: &Reference) -> Result<ResultRecord> {
        self.with_options(reference, &[])
    }

    /// The resource matched by `reference` plus the requested sub-facts.
    ///
    /// A missing resource yields an empty list and no option facts.
    pub fn with_options(
        &self,
        reference: &Reference,
        options: &[RequestedOption],
    ) -> Result<ResultRecord> {
        let found = self.resolver.fetch(&self.descriptor.lookup(), reference)?;
        let Some(resource) = found else {
            log::debug!("{} '{}' not found", self.descriptor.display, reference.as_str());
            return Ok(self.record().fact(self.descriptor.facts_name, Value::Array(Vec::new())));
        };

        let mut record = self.record();
        for option in options {
            log::debug!("Gathering option {}", option.spec.name);
            let payload = self.fetch_option(option, &resource)?;
            record = record.fact(option.spec.fact, payload);
        }
        Ok(record.fact(self.descriptor.facts_name, Value::Array(vec![resource])))
    }

    fn fetch_option(&self, option: &RequestedOption, resource: &Value) -> Result<Value> {
        let uri = resource.get("uri").and_then(Value::as_str).unwrap_or_default();
        let sub = |name: &str| format!("{}/{}", uri.trim_end_matches('/'), name);
        match option.spec.fetch {
            Fetch::Sub(name) => Ok(self.appliance.get(&sub(name))?.unwrap_or(Value::Null)),
            Fetch::SubWithQuery(name) => {
                let query = Query::from_params(&option.params)?;
                Ok(self.appliance.get_with(&sub(name), &query)?.unwrap_or(Value::Null))
            }
            Fetch::Lookup { sub: name, key } => {
                let collection = sub(name);
                let members = match option.params.get(key).and_then(Value::as_str) {
                    Some(value) => self.appliance.find_by(&collection, key, value)?,
                    None => self.appliance.get_all(&collection, &Query::new())?,
                };
                Ok(Value::Array(members))
            }
            Fetch::Custom(fetch) => fetch(self.appliance, resource, &option.params),
        }
    }

    fn record(&self) -> ResultRecord {
        ResultRecord::new(false, MessageCode::FactsRetrieved, self.descriptor.display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Capabilities;
    use appliance::{MemoryAppliance, Method};
    use serde_json::json;

    const ENCLOSURES: &str = "/rest/enclosures";

    fn write_script(appliance: &dyn Appliance, resource: &Value, params: &Map<String, Value>) -> Result<Value> {
        let uri = resource["uri"].as_str().unwrap_or_default();
        let path = params
            .get("file_path")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MandatoryFieldMissing("file_path is required".into()))?;
        appliance.download(&format!("{uri}/script"), std::path::Path::new(path))?;
        Ok(Value::String(path.to_string()))
    }

    const ENCLOSURE_OPTIONS: &[OptionSpec] = &[
        OptionSpec::new("script", "enclosure_script", Fetch::Sub("script")),
        OptionSpec::new("utilization", "enclosure_utilization", Fetch::SubWithQuery("utilization")),
        OptionSpec::new("snapshots", "enclosure_snapshots", Fetch::Lookup { sub: "snapshots", key: "name" }),
        OptionSpec::new("downloadScript", "enclosure_script_file", Fetch::Custom(write_script)),
    ];

    static ENCLOSURE: ResourceDescriptor = ResourceDescriptor::new("enclosure", "Enclosure", ENCLOSURES)
        .facts_name("enclosures")
        .capabilities(Capabilities::CRUD.scoped())
        .options(ENCLOSURE_OPTIONS);

    fn seeded() -> (MemoryAppliance, String) {
        let appliance = MemoryAppliance::new();
        let enclosure = appliance.insert(ENCLOSURES, json!({"name": "enc1"}));
        appliance.insert(ENCLOSURES, json!({"name": "enc2"}));
        let uri = enclosure["uri"].as_str().unwrap().to_string();
        (appliance, uri)
    }

    #[test]
    fn test_list_honours_query() {
        let (appliance, _) = seeded();
        let gatherer = FactsGatherer::new(&appliance, &ENCLOSURE);
        let record = gatherer.list(&Query::new().sort("name:descending").page(0, 1)).unwrap();
        assert!(!record.changed);
        assert_eq!(record.ansible_facts["enclosures"], json!([appliance.members(ENCLOSURES)[1]]));
    }

    #[test]
    fn test_get_missing_returns_empty_list() {
        let (appliance, _) = seeded();
        let gatherer = FactsGatherer::new(&appliance, &ENCLOSURE);
        let options = gatherer.parse_options(&json!(["script"])).unwrap();
        let record = gatherer
            .with_options(&Reference::Key("enc9".into()), &options)
            .unwrap();
        assert_eq!(record.ansible_facts["enclosures"], json!([]));
        assert!(!record.ansible_facts.contains_key("enclosure_script"));
    }

    #[test]
    fn test_options_compose_facts() {
        let (appliance, uri) = seeded();
        appliance.set_document(&format!("{uri}/script"), json!("#!/bin/sh"));
        appliance.set_document(&format!("{uri}/utilization"), json!({"metricList": []}));
        appliance.set_document(
            &format!("{uri}/snapshots"),
            json!({"members": [{"name": "s1"}, {"name": "s2"}]}),
        );

        let gatherer = FactsGatherer::new(&appliance, &ENCLOSURE);
        let options = gatherer
            .parse_options(&json!([
                "script",
                {"utilization": {"fields": "AveragePower", "view": "day"}},
                {"snapshots": {"name": "s2"}}
            ]))
            .unwrap();
        let record = gatherer.with_options(&Reference::Key("enc1".into()), &options).unwrap();

        assert_eq!(record.ansible_facts["enclosure_script"], json!("#!/bin/sh"));
        assert_eq!(record.ansible_facts["enclosure_utilization"], json!({"metricList": []}));
        assert_eq!(record.ansible_facts["enclosure_snapshots"], json!([{"name": "s2"}]));
        assert_eq!(record.ansible_facts["enclosures"][0]["name"], json!("enc1"));

        let utilization = appliance
            .calls()
            .into_iter()
            .find(|call| call.method == Method::Get && call.uri.ends_with("/utilization"))
            .unwrap();
        assert_eq!(utilization.body.unwrap()["fields"], json!("AveragePower"));
        assert!(appliance.mutations().is_empty());
    }

    #[test]
    fn test_custom_fetch_downloads() {
        let (appliance, uri) = seeded();
        appliance.set_document(&format!("{uri}/script"), json!("echo hi"));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enc1.sh");

        let gatherer = FactsGatherer::new(&appliance, &ENCLOSURE);
        let options = gatherer
            .parse_options(&json!([{"downloadScript": {"file_path": path.to_str().unwrap()}}]))
            .unwrap();
        let record = gatherer.with_options(&Reference::Uri(uri), &options).unwrap();
        assert_eq!(record.ansible_facts["enclosure_script_file"], json!(path.to_str().unwrap()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "echo hi");
    }

    #[test]
    fn test_unknown_option_is_rejected() {
        let (appliance, _) = seeded();
        let gatherer = FactsGatherer::new(&appliance, &ENCLOSURE);
        let err = gatherer.parse_options(&json!(["portMap"])).unwrap_err();
        assert_eq!(err.code(), MessageCode::ValueError);
        assert!(err.to_string().contains("script"));
        assert!(appliance.calls().is_empty());
    }
}
