//! Storage systems, pools, volumes and their attachments.

use appliance::{Appliance, Query};
use reconcile::{
    ActionSpec, Call, Capabilities, CreatePolicy, Fetch, Lookup, MessageCode, OptionSpec, Payload,
    ReferenceField, ResourceDescriptor, Result,
};
use serde_json::{Map, Value};

const STORAGE_SYSTEMS: &str = "/rest/storage-systems";
const VOLUMES: &str = "/rest/storage-volumes";
const ATTACHMENTS: &str = "/rest/storage-volume-attachments";

fn host_types(appliance: &dyn Appliance, _: &Value, _: &Map<String, Value>) -> Result<Value> {
    Ok(appliance
        .get(&format!("{STORAGE_SYSTEMS}/host-types"))?
        .unwrap_or(Value::Null))
}

fn attachable_volumes(
    appliance: &dyn Appliance,
    _: &Value,
    params: &Map<String, Value>,
) -> Result<Value> {
    let query = Query::from_params(params)?;
    let members = appliance.get_all(&format!("{VOLUMES}/attachable-volumes"), &query)?;
    Ok(Value::Array(members))
}

fn extra_managed_paths(
    appliance: &dyn Appliance,
    _: &Value,
    _: &Map<String, Value>,
) -> Result<Value> {
    let query = Query::new().filter("alertFixType='ExtraManagedStorageVolumePaths'");
    Ok(Value::Array(
        appliance.get_all(&format!("{VOLUMES}/repair"), &query)?,
    ))
}

fn extra_unmanaged_volumes(
    appliance: &dyn Appliance,
    _: &Value,
    _: &Map<String, Value>,
) -> Result<Value> {
    let query = Query::new().filter("alertFixType='ExtraUnmanagedStorageVolumes'");
    Ok(Value::Array(
        appliance.get_all(&format!("{ATTACHMENTS}/repair"), &query)?,
    ))
}

const STORAGE_SYSTEM_OPTIONS: &[OptionSpec] = &[
    OptionSpec::new(
        "hostTypes",
        "storage_system_host_types",
        Fetch::Custom(host_types),
    ),
    OptionSpec::new(
        "storagePools",
        "storage_system_pools",
        Fetch::Sub("storage-pools"),
    ),
    OptionSpec::new(
        "reachablePorts",
        "storage_system_reachable_ports",
        Fetch::Sub("reachable-ports"),
    ),
    OptionSpec::new(
        "templates",
        "storage_system_templates",
        Fetch::Sub("templates"),
    ),
];

pub static STORAGE_SYSTEM: ResourceDescriptor =
    ResourceDescriptor::new("storage_system", "Storage System", STORAGE_SYSTEMS)
        .key("hostname")
        .facts_name("storage_systems")
        .capabilities(Capabilities::CRUD.etagged())
        .write_only(&["credentials"])
        .options(STORAGE_SYSTEM_OPTIONS);

const POOL_REFERENCES: &[ReferenceField] = &[ReferenceField::new(
    "storageSystemName",
    "storageSystemUri",
    Lookup::new(STORAGE_SYSTEMS, "Storage System"),
)];

const POOL_ACTIONS: &[ActionSpec] = &[ActionSpec::new(
    "refreshed",
    MessageCode::Refreshed,
    Call::Put {
        sub: "",
        body: Payload::Merged,
    },
)];

pub static STORAGE_POOL: ResourceDescriptor =
    ResourceDescriptor::new("storage_pool", "Storage Pool", "/rest/storage-pools")
        .facts_name("storage_pools")
        .capabilities(Capabilities::CRUD.scoped().etagged())
        .create_policy(CreatePolicy::ApplianceFrom(500))
        .references(POOL_REFERENCES)
        .actions(POOL_ACTIONS);

const VOLUME_REFERENCES: &[ReferenceField] = &[
    ReferenceField::new(
        "storagePoolName",
        "storagePool",
        Lookup::new("/rest/storage-pools", "Storage Pool"),
    ),
    ReferenceField::new(
        "storageSystemName",
        "storageSystemUri",
        Lookup::new(STORAGE_SYSTEMS, "Storage System"),
    ),
    ReferenceField::new(
        "templateName",
        "templateUri",
        Lookup::new("/rest/storage-volume-templates", "Storage Volume Template"),
    ),
];

const VOLUME_OPTIONS: &[OptionSpec] = &[
    OptionSpec::new(
        "attachableVolumes",
        "attachable_volumes",
        Fetch::Custom(attachable_volumes),
    ),
    OptionSpec::new(
        "extraManagedVolumePaths",
        "extra_managed_volume_paths",
        Fetch::Custom(extra_managed_paths),
    ),
    OptionSpec::new(
        "snapshots",
        "snapshots",
        Fetch::Lookup {
            sub: "snapshots",
            key: "name",
        },
    ),
];

const VOLUME_ACTIONS: &[ActionSpec] = &[ActionSpec::new(
    "snapshot_created",
    MessageCode::Created,
    Call::Post {
        sub: "snapshots",
        body: Payload::Field("snapshotParameters"),
    },
)
.fact("volume_snapshot")];

pub static VOLUME: ResourceDescriptor = ResourceDescriptor::new("volume", "Volume", VOLUMES)
    .facts_name("storage_volumes")
    .fact_name("storage_volume")
    .capabilities(Capabilities::CRUD.scoped().etagged())
    .references(VOLUME_REFERENCES)
    .options(VOLUME_OPTIONS)
    .actions(VOLUME_ACTIONS);

const ATTACHMENT_REFERENCES: &[ReferenceField] = &[ReferenceField::new(
    "serverProfileName",
    "resourceUri",
    Lookup::new("/rest/server-profiles", "Server Profile"),
)];

const ATTACHMENT_OPTIONS: &[OptionSpec] = &[
    OptionSpec::new(
        "extraUnmanagedStorageVolumes",
        "extra_unmanaged_storage_volumes",
        Fetch::Custom(extra_unmanaged_volumes),
    ),
    OptionSpec::new("paths", "storage_volume_attachment_paths", Fetch::Sub("paths")),
];

const ATTACHMENT_ACTIONS: &[ActionSpec] = &[ActionSpec::new(
    "extra_presentations_removed",
    MessageCode::PresentationsRemoved,
    Call::Post {
        sub: "repair",
        body: Payload::Tagged {
            fields: &["resourceUri"],
            key: "type",
            value: "ExtraUnmanagedStorageVolumes",
        },
    },
)
.on_collection()
.fact("storage_volume_attachment_repair")];

pub static STORAGE_VOLUME_ATTACHMENT: ResourceDescriptor = ResourceDescriptor::new(
    "storage_volume_attachment",
    "Storage Volume Attachment",
    ATTACHMENTS,
)
.facts_name("storage_volume_attachments")
.capabilities(Capabilities::READ_ONLY)
.references(ATTACHMENT_REFERENCES)
.options(ATTACHMENT_OPTIONS)
.actions(ATTACHMENT_ACTIONS);

#[cfg(test)]
mod tests {
    use super::*;
    use appliance::{MemoryAppliance, Method};
    use reconcile::{FactsGatherer, ReconciliationEngine, Reference};
    use serde_json::json;

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_pool_is_appliance_created_from_api_500() {
        let appliance = MemoryAppliance::with_api_version(600);
        let err = ReconciliationEngine::new(&appliance, &STORAGE_POOL)
            .present(&data(json!({"name": "pool1"})))
            .unwrap_err();
        assert_eq!(err.code(), MessageCode::ResourceNotFoundForCreate);

        let legacy = MemoryAppliance::with_api_version(300);
        let record = ReconciliationEngine::new(&legacy, &STORAGE_POOL)
            .present(&data(json!({"name": "pool1"})))
            .unwrap();
        assert_eq!(record.code, MessageCode::Created);
    }

    #[test]
    fn test_storage_system_credentials_not_compared() {
        let appliance = MemoryAppliance::new();
        appliance.insert(STORAGE_SYSTEMS, json!({"hostname": "3par.local", "family": "StoreServ"}));
        let record = ReconciliationEngine::new(&appliance, &STORAGE_SYSTEM)
            .present(&data(json!({
                "hostname": "3par.local",
                "family": "StoreServ",
                "credentials": {"username": "admin", "password": "secret"}
            })))
            .unwrap();
        assert!(!record.changed);
        assert!(appliance.mutations().is_empty());
    }

    #[test]
    fn test_volume_resolves_pool_inside_properties() {
        let appliance = MemoryAppliance::new();
        let pool = appliance.insert("/rest/storage-pools", json!({"name": "FST_CPG1"}));
        let record = ReconciliationEngine::new(&appliance, &VOLUME)
            .present(&data(json!({
                "name": "vol1",
                "properties": {"name": "vol1", "storagePoolName": "FST_CPG1", "size": 1_073_741_824}
            })))
            .unwrap();
        assert_eq!(record.code, MessageCode::Created);
        assert_eq!(
            record.ansible_facts["storage_volume"]["properties"]["storagePool"],
            pool["uri"]
        );
    }

    #[test]
    fn test_remove_extra_presentations() {
        let appliance = MemoryAppliance::new();
        let profile = appliance.insert("/rest/server-profiles", json!({"name": "sp1"}));
        let record = ReconciliationEngine::new(&appliance, &STORAGE_VOLUME_ATTACHMENT)
            .run("extra_presentations_removed", &data(json!({"serverProfileName": "sp1"})))
            .unwrap();
        assert!(record.changed);
        assert_eq!(record.code, MessageCode::PresentationsRemoved);

        let repair = &appliance.mutations()[0];
        assert_eq!(repair.method, Method::Post);
        assert_eq!(repair.uri, format!("{ATTACHMENTS}/repair"));
        assert_eq!(repair.body.as_ref().unwrap()["resourceUri"], profile["uri"]);
    }

    #[test]
    fn test_host_types_option() {
        let appliance = MemoryAppliance::new();
        appliance.insert(STORAGE_SYSTEMS, json!({"hostname": "3par.local"}));
        appliance.set_document(&format!("{STORAGE_SYSTEMS}/host-types"), json!(["Windows", "Linux"]));

        let gatherer = FactsGatherer::new(&appliance, &STORAGE_SYSTEM);
        let options = gatherer.parse_options(&json!(["hostTypes"])).unwrap();
        let record = gatherer
            .with_options(&Reference::Key("3par.local".into()), &options)
            .unwrap();
        assert_eq!(record.ansible_facts["storage_system_host_types"], json!(["Windows", "Linux"]));
    }
}
