//! Image Streamer kinds. These share the OneView session.

use appliance::Appliance;
use reconcile::{
    Capabilities, Endpoint, Error, Fetch, Lookup, OptionSpec, ReferenceField, ResourceDescriptor,
    Result,
};
use serde_json::{Map, Value};
use std::path::Path;

const BUILD_PLANS: &str = "/rest/build-plans";

const DEPLOYMENT_PLAN_REFERENCES: &[ReferenceField] = &[
    ReferenceField::new(
        "oeBuildPlanName",
        "oeBuildPlanURI",
        Lookup::new(BUILD_PLANS, "OS Build Plan"),
    ),
    ReferenceField::new(
        "goldenImageName",
        "goldenImageURI",
        Lookup::new("/rest/golden-images", "Golden Image"),
    ),
];

const DEPLOYMENT_PLAN_OPTIONS: &[OptionSpec] = &[
    OptionSpec::new("usedby", "deployment_plan_used_by", Fetch::Sub("usedby")),
    OptionSpec::new("osdp", "deployment_plan_osdp", Fetch::Sub("osdp")),
];

pub static DEPLOYMENT_PLAN: ResourceDescriptor =
    ResourceDescriptor::new("deployment_plan", "Deployment Plan", "/rest/deployment-plans")
        .endpoint(Endpoint::ImageStreamer)
        .facts_name("deployment_plans")
        .references(DEPLOYMENT_PLAN_REFERENCES)
        .options(DEPLOYMENT_PLAN_OPTIONS);

pub static BUILD_PLAN: ResourceDescriptor =
    ResourceDescriptor::new("build_plan", "OS Build Plan", BUILD_PLANS)
        .endpoint(Endpoint::ImageStreamer)
        .facts_name("build_plans");

pub static PLAN_SCRIPT: ResourceDescriptor =
    ResourceDescriptor::new("plan_script", "Plan Script", "/rest/plan-scripts")
        .endpoint(Endpoint::ImageStreamer)
        .facts_name("plan_scripts")
        .write_only(&["content"]);

/// Download the archived logs of an OS volume to `file_path`.
fn archived_logs(
    appliance: &dyn Appliance,
    resource: &Value,
    params: &Map<String, Value>,
) -> Result<Value> {
    let destination = params
        .get("file_path")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            Error::MandatoryFieldMissing("getArchivedLogs requires 'file_path'".to_string())
        })?;
    let id = resource
        .get("uri")
        .and_then(Value::as_str)
        .and_then(|uri| uri.rsplit('/').next())
        .ok_or_else(|| Error::Value("OS Volume has no uri".to_string()))?;

    log::info!("Downloading archived logs of OS Volume {id} to {destination}");
    appliance.download(&format!("/rest/os-volumes/archive/{id}"), Path::new(destination))?;
    Ok(Value::String(destination.to_string()))
}

const OS_VOLUME_OPTIONS: &[OptionSpec] = &[
    OptionSpec::new(
        "getArchivedLogs",
        "os_volume_archived_logs",
        Fetch::Custom(archived_logs),
    ),
    OptionSpec::new("getStorage", "os_volume_storage", Fetch::Sub("storage")),
];

pub static OS_VOLUME: ResourceDescriptor =
    ResourceDescriptor::new("os_volume", "OS Volume", "/rest/os-volumes")
        .endpoint(Endpoint::ImageStreamer)
        .facts_name("os_volumes")
        .capabilities(Capabilities::READ_ONLY)
        .options(OS_VOLUME_OPTIONS);

#[cfg(test)]
mod tests {
    use super::*;
    use appliance::MemoryAppliance;
    use reconcile::{FactsGatherer, MessageCode, ReconciliationEngine, Reference};
    use serde_json::json;

    #[test]
    fn test_archived_logs_download() {
        let appliance = MemoryAppliance::new();
        appliance.insert(OS_VOLUME.path, json!({"name": "vol1", "uri": "/rest/os-volumes/abc"}));
        appliance.set_document("/rest/os-volumes/archive/abc", json!("log line"));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vol1.tar.gz");

        let gatherer = FactsGatherer::new(&appliance, &OS_VOLUME);
        let options = gatherer
            .parse_options(&json!([{"getArchivedLogs": {"file_path": path.to_str().unwrap()}}]))
            .unwrap();
        let record = gatherer
            .with_options(&Reference::Key("vol1".into()), &options)
            .unwrap();

        assert_eq!(record.ansible_facts["os_volume_archived_logs"], json!(path.to_str().unwrap()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "log line");
    }

    #[test]
    fn test_archived_logs_requires_path() {
        let appliance = MemoryAppliance::new();
        appliance.insert(OS_VOLUME.path, json!({"name": "vol1"}));
        let gatherer = FactsGatherer::new(&appliance, &OS_VOLUME);
        let options = gatherer.parse_options(&json!(["getArchivedLogs"])).unwrap();
        let err = gatherer
            .with_options(&Reference::Key("vol1".into()), &options)
            .unwrap_err();
        assert_eq!(err.code(), MessageCode::MandatoryFieldMissing);
    }

    #[test]
    fn test_deployment_plan_resolves_build_plan() {
        let appliance = MemoryAppliance::new();
        let plan = appliance.insert(BUILD_PLANS, json!({"name": "HPE - Foundation 1.0"}));
        let desired = json!({"name": "dp1", "oeBuildPlanName": "HPE - Foundation 1.0"});
        let record = ReconciliationEngine::new(&appliance, &DEPLOYMENT_PLAN)
            .present(desired.as_object().unwrap())
            .unwrap();
        assert_eq!(record.ansible_facts["deployment_plan"]["oeBuildPlanURI"], plan["uri"]);
    }
}
