//! Enclosures, server hardware, profiles and the SAS/drive hardware around them.

use reconcile::{
    ActionSpec, Call, Capabilities, Fetch, Lookup, MessageCode, OptionSpec, Payload, Precheck,
    ReferenceField, ResourceDescriptor,
};

const ENCLOSURE_GROUPS: Lookup = Lookup::new("/rest/enclosure-groups", "Enclosure Group");

const fn patch_state(
    state: &'static str,
    path: &'static str,
    field: &'static str,
    value: &'static str,
) -> ActionSpec {
    ActionSpec::new(
        state,
        MessageCode::StateChanged,
        Call::Patch {
            path,
            value: Payload::Text(value),
        },
    )
    .unless(Precheck::Field {
        field,
        expect: value,
    })
}

const fn reset(state: &'static str, path: &'static str) -> ActionSpec {
    ActionSpec::new(
        state,
        MessageCode::StateChanged,
        Call::Patch {
            path,
            value: Payload::Text("Reset"),
        },
    )
}

const REFRESHED: ActionSpec = ActionSpec::new(
    "refreshed",
    MessageCode::Refreshed,
    Call::Put {
        sub: "refreshState",
        body: Payload::Pair("refreshState", "RefreshPending"),
    },
);

const ENCLOSURE_REFERENCES: &[ReferenceField] = &[ReferenceField::new(
    "enclosureGroupName",
    "enclosureGroupUri",
    ENCLOSURE_GROUPS,
)];

const ENCLOSURE_OPTIONS: &[OptionSpec] = &[
    OptionSpec::new("script", "enclosure_script", Fetch::Sub("script")),
    OptionSpec::new(
        "environmentalConfiguration",
        "enclosure_environmental_configuration",
        Fetch::Sub("environmentalConfiguration"),
    ),
    OptionSpec::new(
        "utilization",
        "enclosure_utilization",
        Fetch::SubWithQuery("utilization"),
    ),
];

const ENCLOSURE_ACTIONS: &[ActionSpec] = &[
    REFRESHED,
    ActionSpec::new(
        "reconfigured",
        MessageCode::Updated,
        Call::Put {
            sub: "configuration",
            body: Payload::Empty,
        },
    ),
    patch_state("uid_on", "/uidState", "uidState", "On"),
    patch_state("uid_off", "/uidState", "uidState", "Off"),
];

pub static ENCLOSURE: ResourceDescriptor =
    ResourceDescriptor::new("enclosure", "Enclosure", "/rest/enclosures")
        .facts_name("enclosures")
        .capabilities(Capabilities::CRUD.scoped().etagged())
        .references(ENCLOSURE_REFERENCES)
        .write_only(&["password"])
        .options(ENCLOSURE_OPTIONS)
        .actions(ENCLOSURE_ACTIONS);

const ENCLOSURE_GROUP_REFERENCES: &[ReferenceField] = &[ReferenceField::new(
    "logicalInterconnectGroupName",
    "logicalInterconnectGroupUri",
    Lookup::new(
        "/rest/logical-interconnect-groups",
        "Logical Interconnect Group",
    ),
)];

const ENCLOSURE_GROUP_OPTIONS: &[OptionSpec] = &[OptionSpec::new(
    "configuration_script",
    "enclosure_group_script",
    Fetch::Sub("script"),
)];

pub static ENCLOSURE_GROUP: ResourceDescriptor =
    ResourceDescriptor::new("enclosure_group", "Enclosure Group", "/rest/enclosure-groups")
        .facts_name("enclosure_groups")
        .capabilities(Capabilities::CRUD.scoped().etagged())
        .references(ENCLOSURE_GROUP_REFERENCES)
        .options(ENCLOSURE_GROUP_OPTIONS);

const SERVER_HARDWARE_OPTIONS: &[OptionSpec] = &[
    OptionSpec::new("bios", "server_hardware_bios", Fetch::Sub("bios")),
    OptionSpec::new(
        "environmentalConfig",
        "server_hardware_env_config",
        Fetch::Sub("environmentalConfiguration"),
    ),
    OptionSpec::new(
        "firmware",
        "server_hardware_firmware",
        Fetch::Sub("firmware"),
    ),
    OptionSpec::new(
        "javaRemoteConsoleUrl",
        "server_hardware_java_remote_console_url",
        Fetch::Sub("javaRemoteConsoleUrl"),
    ),
    OptionSpec::new(
        "iloSsoUrl",
        "server_hardware_ilo_sso_url",
        Fetch::Sub("iloSsoUrl"),
    ),
    OptionSpec::new(
        "remoteConsoleUrl",
        "server_hardware_remote_console_url",
        Fetch::Sub("remoteConsoleUrl"),
    ),
    OptionSpec::new(
        "utilization",
        "server_hardware_utilization",
        Fetch::SubWithQuery("utilization"),
    ),
];

const SERVER_HARDWARE_ACTIONS: &[ActionSpec] = &[
    REFRESHED,
    ActionSpec::new(
        "power_state_set",
        MessageCode::StateChanged,
        Call::Put {
            sub: "powerState",
            body: Payload::Fields(&["powerState", "powerControl"]),
        },
    ),
    patch_state("uid_on", "/uidState", "uidState", "On"),
    patch_state("uid_off", "/uidState", "uidState", "Off"),
    ActionSpec::new(
        "ilo_state_reset",
        MessageCode::StateChanged,
        Call::Patch {
            path: "/mpState",
            value: Payload::Text("Reset"),
        },
    )
    .since(300),
];

pub static SERVER_HARDWARE: ResourceDescriptor =
    ResourceDescriptor::new("server_hardware", "Server Hardware", "/rest/server-hardware")
        .facts_name("server_hardwares")
        .capabilities(Capabilities::CRUD.scoped().without_update())
        .write_only(&["password"])
        .options(SERVER_HARDWARE_OPTIONS)
        .actions(SERVER_HARDWARE_ACTIONS);

const PROFILE_REFERENCES: &[ReferenceField] = &[
    ReferenceField::new(
        "serverHardwareName",
        "serverHardwareUri",
        Lookup::new("/rest/server-hardware", "Server Hardware"),
    ),
    ReferenceField::new(
        "serverProfileTemplateName",
        "serverProfileTemplateUri",
        Lookup::new("/rest/server-profile-templates", "Server Profile Template"),
    ),
    ReferenceField::new(
        "serverHardwareTypeName",
        "serverHardwareTypeUri",
        Lookup::new("/rest/server-hardware-types", "Server Hardware Type"),
    ),
    ReferenceField::new("enclosureGroupName", "enclosureGroupUri", ENCLOSURE_GROUPS),
    ReferenceField::new(
        "networkName",
        "networkUri",
        Lookup::new("/rest/ethernet-networks", "Ethernet Network"),
    ),
];

const PROFILE_OPTIONS: &[OptionSpec] = &[
    OptionSpec::new("messages", "server_profile_messages", Fetch::Sub("messages")),
    OptionSpec::new(
        "compliancePreview",
        "server_profile_compliance_preview",
        Fetch::Sub("compliance-preview"),
    ),
    OptionSpec::new(
        "transformation",
        "server_profile_transformation",
        Fetch::SubWithQuery("transformation"),
    ),
];

const PROFILE_ACTIONS: &[ActionSpec] = &[
    ActionSpec::new(
        "compliance_preview",
        MessageCode::DifferencesRetrieved,
        Call::Get {
            sub: "compliance-preview",
        },
    )
    .fact("server_profile_compliance_preview"),
    ActionSpec::new(
        "compliant",
        MessageCode::Updated,
        Call::Patch {
            path: "/templateCompliance",
            value: Payload::Text("Compliant"),
        },
    )
    .unless(Precheck::Field {
        field: "templateCompliance",
        expect: "Compliant",
    }),
];

pub static SERVER_PROFILE: ResourceDescriptor =
    ResourceDescriptor::new("server_profile", "Server Profile", "/rest/server-profiles")
        .facts_name("server_profiles")
        .capabilities(Capabilities::CRUD.scoped().etagged())
        .references(PROFILE_REFERENCES)
        .additive(&[("connectionSettings.connections", "id")])
        .options(PROFILE_OPTIONS)
        .actions(PROFILE_ACTIONS);

const TEMPLATE_OPTIONS: &[OptionSpec] = &[
    OptionSpec::new("new_profile", "new_server_profile", Fetch::Sub("new-profile")),
    OptionSpec::new(
        "transformation",
        "server_profile_template_transformation",
        Fetch::SubWithQuery("transformation"),
    ),
];

pub static SERVER_PROFILE_TEMPLATE: ResourceDescriptor = ResourceDescriptor::new(
    "server_profile_template",
    "Server Profile Template",
    "/rest/server-profile-templates",
)
.facts_name("server_profile_templates")
.capabilities(Capabilities::CRUD.scoped().etagged())
.references(PROFILE_REFERENCES)
.options(TEMPLATE_OPTIONS);

const RACK_OPTIONS: &[OptionSpec] = &[OptionSpec::new(
    "deviceTopology",
    "rack_device_topology",
    Fetch::Sub("deviceTopology"),
)];

pub static RACK: ResourceDescriptor = ResourceDescriptor::new("rack", "Rack", "/rest/racks")
    .facts_name("racks")
    .capabilities(Capabilities::CRUD.scoped().etagged())
    .options(RACK_OPTIONS);

const HARDWARE_ACTIONS: &[ActionSpec] = &[
    REFRESHED,
    patch_state("powered_on", "/powerState", "powerState", "On"),
    patch_state("powered_off", "/powerState", "powerState", "Off"),
    patch_state("uid_on", "/uidState", "uidState", "On"),
    patch_state("uid_off", "/uidState", "uidState", "Off"),
    reset("soft_reset", "/softResetState"),
    reset("hard_reset", "/hardResetState"),
];

pub static SAS_INTERCONNECT: ResourceDescriptor =
    ResourceDescriptor::new("sas_interconnect", "SAS Interconnect", "/rest/sas-interconnects")
        .facts_name("sas_interconnects")
        .capabilities(Capabilities::READ_ONLY)
        .actions(HARDWARE_ACTIONS);

const DRIVE_ENCLOSURE_OPTIONS: &[OptionSpec] = &[OptionSpec::new(
    "portMap",
    "drive_enclosure_port_map",
    Fetch::Sub("port-map"),
)];

pub static DRIVE_ENCLOSURE: ResourceDescriptor =
    ResourceDescriptor::new("drive_enclosure", "Drive Enclosure", "/rest/drive-enclosures")
        .facts_name("drive_enclosures")
        .capabilities(Capabilities::READ_ONLY)
        .options(DRIVE_ENCLOSURE_OPTIONS)
        .actions(HARDWARE_ACTIONS);
