//! OS deployment: build plan job followed by personalization.

use super::{
    BUILD_PLANS, JOBS, PERSONALIZE, Provisioner, SERVER, SERVER_FACT, scheduled, uri_of,
};
use reconcile::{
    Error, Lookup, MessageCode, Result, ResultRecord, TaskOutcome, merge_list_by_key,
};
use serde_json::{Map, Value, json};

/// What to deploy where.
#[derive(Debug, Clone, Default)]
pub struct DeployRequest {
    /// Serial number of the target server.
    pub server_id: String,
    /// Build plan name.
    pub os_build_plan: String,
    /// Network personalization applied after the build plan.
    pub personality_data: Option<Value>,
    /// Server custom attributes, written before the build plan runs.
    pub custom_attributes: Vec<(String, Value)>,
}

/// Parse custom attributes given as a mapping, a list of single-key
/// mappings, or a list of `{key, value}` entries.
pub fn custom_attributes(raw: &Value) -> Result<Vec<(String, Value)>> {
    let invalid = |item: &Value| {
        Error::Value(format!(
            "custom attributes must be mappings of name to value, got {item}"
        ))
    };
    match raw {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        Value::Array(items) => {
            let mut attributes = Vec::new();
            for item in items {
                let Value::Object(map) = item else {
                    return Err(invalid(item));
                };
                match (map.get("key").and_then(Value::as_str), map.get("value")) {
                    (Some(key), Some(value)) if map.len() == 2 => {
                        attributes.push((key.to_string(), value.clone()));
                    }
                    _ => attributes.extend(map.iter().map(|(k, v)| (k.clone(), v.clone()))),
                }
            }
            Ok(attributes)
        }
        other => Err(invalid(other)),
    }
}

impl Provisioner<'_> {
    /// Run `request.os_build_plan` on the server with serial `request.server_id`.
    pub fn deploy(&self, request: &DeployRequest) -> Result<ResultRecord> {
        if request.server_id.is_empty() || request.os_build_plan.is_empty() {
            return Err(Error::MandatoryFieldMissing(
                "OS deployment requires a server id and a build plan".to_string(),
            ));
        }

        let plan_lookup = Lookup::new(BUILD_PLANS, "OS Build Plan");
        let plan = self
            .resolver
            .find(&plan_lookup, &request.os_build_plan)?
            .ok_or_else(|| Error::not_found("OS Build Plan", &request.os_build_plan))?;
        let plan_uri = uri_of(&plan)?;

        let mut server = self.server_by_serial(&request.server_id)?;
        let server_uri = uri_of(&server)?;

        if !request.custom_attributes.is_empty() {
            let existing = server
                .get("customAttributes")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let incoming: Vec<Value> = request
                .custom_attributes
                .iter()
                .map(|(key, value)| {
                    json!({"key": key, "values": [{"scope": "server", "value": value}]})
                })
                .collect();
            server["customAttributes"] =
                Value::Array(merge_list_by_key(&existing, &incoming, "key"));

            log::info!("Updating custom attributes of {server_uri}");
            let answer = self.appliance.put(&server_uri, &server)?;
            if let Some(task) = self.settle(&answer)? {
                return Ok(scheduled(&task));
            }
        }

        let build = json!({
            "osbpUris": [plan_uri],
            "serverData": [{"serverUri": server_uri, "personalityData": null}],
            "stepNo": 1,
        });
        if let TaskOutcome::Scheduled(task) = self.run_job(JOBS, &build)? {
            return Ok(scheduled(&task));
        }

        let personality = request.personality_data.as_ref().unwrap_or(&Value::Null);
        let personalize = personalization(&server_uri, personality);
        if let TaskOutcome::Scheduled(task) = self.run_job(PERSONALIZE, &personalize)? {
            return Ok(scheduled(&task));
        }

        let deployed = self.appliance.get(&server_uri)?.unwrap_or(server);
        Ok(ResultRecord::new(true, MessageCode::OsDeployed, SERVER).fact(SERVER_FACT, deployed))
    }
}

/// Personalization body for one server.
pub(super) fn personalization(server_uri: &str, personality: &Value) -> Value {
    let mut entry = Map::new();
    entry.insert("serverUri".to_string(), Value::String(server_uri.to_string()));
    entry.insert("personalityData".to_string(), personality.clone());
    entry.insert("skipReboot".to_string(), Value::Bool(true));
    json!({"serverData": [entry]})
}

#[cfg(test)]
mod tests {
    use super::super::SERVERS;
    use super::*;
    use appliance::{MemoryAppliance, Method};
    use reconcile::TaskMonitor;
    use std::time::Duration;

    fn seeded() -> MemoryAppliance {
        let appliance = MemoryAppliance::new();
        appliance.insert(BUILD_PLANS, json!({"name": "RHEL7"}));
        appliance.insert(
            SERVERS,
            json!({
                "serialNumber": "SN1",
                "name": "srv1",
                "customAttributes": [
                    {"key": "hostname", "values": [{"scope": "server", "value": "old"}]}
                ]
            }),
        );
        appliance.script_response(Method::Post, JOBS, json!({"uri": "/rest/os-deployment-jobs/1"}));
        appliance.script_task(
            "/rest/os-deployment-jobs/1",
            vec![
                json!({"running": "true", "state": "STATUS_ACTIVE", "name": "build"}),
                json!({"running": "false", "state": "STATUS_SUCCESS", "name": "build"}),
            ],
        );
        appliance.script_response(
            Method::Post,
            PERSONALIZE,
            json!({"uri": "/rest/os-deployment-jobs/2"}),
        );
        appliance.script_task(
            "/rest/os-deployment-jobs/2",
            vec![json!({"running": "false", "state": "STATUS_SUCCESS", "name": "personalize"})],
        );
        appliance
    }

    fn provisioner(appliance: &MemoryAppliance) -> Provisioner<'_> {
        Provisioner::new(appliance)
            .with_monitor(TaskMonitor::new(appliance).with_interval(Duration::ZERO))
    }

    fn request() -> DeployRequest {
        DeployRequest {
            server_id: "SN1".into(),
            os_build_plan: "RHEL7".into(),
            ..DeployRequest::default()
        }
    }

    #[test]
    fn test_deploy_runs_build_plan_then_personalization() {
        let appliance = seeded();
        let record = provisioner(&appliance).deploy(&request()).unwrap();

        assert!(record.changed);
        assert_eq!(record.msg, "OS Deployed Successfully.");
        assert_eq!(record.code, MessageCode::OsDeployed);
        assert_eq!(record.ansible_facts["icsp_server"]["serialNumber"], json!("SN1"));

        let posts: Vec<String> = appliance
            .calls()
            .into_iter()
            .filter(|call| call.method == Method::Post)
            .map(|call| call.uri)
            .collect();
        assert_eq!(posts, vec![JOBS.to_string(), PERSONALIZE.to_string()]);

        let build = appliance
            .calls()
            .into_iter()
            .find(|call| call.uri == JOBS)
            .and_then(|call| call.body)
            .unwrap();
        assert_eq!(build["osbpUris"][0], appliance.members(BUILD_PLANS)[0]["uri"]);
    }

    #[test]
    fn test_deploy_merges_custom_attributes() {
        let appliance = seeded();
        let mut deploy = request();
        deploy.custom_attributes = custom_attributes(&json!([
            {"hostname": "web01"},
            {"key": "domain", "value": "example.com"}
        ]))
        .unwrap();
        provisioner(&appliance).deploy(&deploy).unwrap();

        let attributes = appliance.members(SERVERS)[0]["customAttributes"].clone();
        let attributes = attributes.as_array().unwrap();
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes[0]["values"][0]["value"], json!("web01"));
        assert_eq!(attributes[1]["key"], json!("domain"));
    }

    #[test]
    fn test_failed_build_plan_stops_deployment() {
        let appliance = seeded();
        appliance.script_task(
            "/rest/os-deployment-jobs/1",
            vec![json!({
                "running": "false",
                "state": "STATUS_FAILURE",
                "name": "build",
                "jobResult": [{"jobResultErrorDetails": "disk not found"}]
            })],
        );
        let err = provisioner(&appliance).deploy(&request()).unwrap_err();
        assert_eq!(err.code(), MessageCode::TaskFailed);
        assert!(err.to_string().contains("disk not found"));
        assert!(!appliance.calls().iter().any(|call| call.uri == PERSONALIZE));
    }

    #[test]
    fn test_unknown_server_is_not_found() {
        let appliance = seeded();
        let mut deploy = request();
        deploy.server_id = "SN9".into();
        let err = provisioner(&appliance).deploy(&deploy).unwrap_err();
        assert_eq!(err.code(), MessageCode::ResourceNotFound);
        assert!(appliance.mutations().is_empty());
    }

    #[test]
    fn test_job_without_uri_is_not_started() {
        let appliance = MemoryAppliance::new();
        appliance.insert(BUILD_PLANS, json!({"name": "RHEL7"}));
        appliance.insert(SERVERS, json!({"serialNumber": "SN1"}));
        appliance.script_response(Method::Post, JOBS, json!({}));
        let err = provisioner(&appliance).deploy(&request()).unwrap_err();
        assert_eq!(err.code(), MessageCode::JobNotStarted);
    }

    #[test]
    fn test_custom_attribute_shapes() {
        let mapping = custom_attributes(&json!({"a": "1"})).unwrap();
        assert_eq!(mapping, vec![("a".to_string(), json!("1"))]);
        assert!(custom_attributes(&json!("a=1")).is_err());
        assert!(custom_attributes(&Value::Null).unwrap().is_empty());
    }
}
