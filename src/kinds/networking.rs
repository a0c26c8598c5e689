//! Networks, network sets, interconnect groups and fabric plumbing.

use reconcile::{
    ActionSpec, Call, Capabilities, Fetch, Lookup, MessageCode, OptionSpec, Payload, Precheck,
    ReferenceField, ResourceDescriptor,
};

const NETWORK: Capabilities = Capabilities::CRUD.scoped().etagged();

pub static FC_NETWORK: ResourceDescriptor =
    ResourceDescriptor::new("fc_network", "FC Network", "/rest/fc-networks")
        .facts_name("fc_networks")
        .capabilities(NETWORK);

pub static FCOE_NETWORK: ResourceDescriptor =
    ResourceDescriptor::new("fcoe_network", "FCoE Network", "/rest/fcoe-networks")
        .facts_name("fcoe_networks")
        .capabilities(NETWORK);

const ETHERNET_OPTIONS: &[OptionSpec] = &[
    OptionSpec::new(
        "associatedProfiles",
        "enet_associated_profiles",
        Fetch::Sub("associatedProfiles"),
    ),
    OptionSpec::new(
        "associatedUplinkGroups",
        "enet_associated_uplink_groups",
        Fetch::Sub("associatedUplinkGroups"),
    ),
];

pub static ETHERNET_NETWORK: ResourceDescriptor =
    ResourceDescriptor::new("ethernet_network", "Ethernet Network", "/rest/ethernet-networks")
        .facts_name("ethernet_networks")
        .capabilities(NETWORK)
        .options(ETHERNET_OPTIONS);

const NETWORK_SET_REFERENCES: &[ReferenceField] = &[ReferenceField::new(
    "nativeNetworkName",
    "nativeNetworkUri",
    Lookup::new("/rest/ethernet-networks", "Ethernet Network"),
)];

const NETWORK_SET_OPTIONS: &[OptionSpec] = &[OptionSpec::new(
    "withoutEthernet",
    "network_set_without_ethernet",
    Fetch::Sub("withoutEthernet"),
)];

pub static NETWORK_SET: ResourceDescriptor =
    ResourceDescriptor::new("network_set", "Network Set", "/rest/network-sets")
        .facts_name("network_sets")
        .capabilities(NETWORK)
        .references(NETWORK_SET_REFERENCES)
        .options(NETWORK_SET_OPTIONS);

const LIG_REFERENCES: &[ReferenceField] = &[ReferenceField::new(
    "permittedInterconnectTypeName",
    "permittedInterconnectTypeUri",
    Lookup::new("/rest/interconnect-types", "Interconnect Type"),
)];

pub static LOGICAL_INTERCONNECT_GROUP: ResourceDescriptor = ResourceDescriptor::new(
    "logical_interconnect_group",
    "Logical Interconnect Group",
    "/rest/logical-interconnect-groups",
)
.facts_name("logical_interconnect_groups")
.capabilities(NETWORK)
.references(LIG_REFERENCES)
.ordered(&["interconnectMapTemplate.interconnectMapEntryTemplates"]);

const FABRIC_ACTIONS: &[ActionSpec] = &[ActionSpec::new(
    "reserved_vlan_range_updated",
    MessageCode::Updated,
    Call::Put {
        sub: "reserved-vlan-range",
        body: Payload::Field("reservedVlanRangeParameters"),
    },
)
.unless(Precheck::SubResource {
    sub: "reserved-vlan-range",
    field: "reservedVlanRangeParameters",
})
.since(300)];

const FABRIC_OPTIONS: &[OptionSpec] = &[OptionSpec::new(
    "reservedVlanRange",
    "fabric_reserved_vlan_range",
    Fetch::Sub("reserved-vlan-range"),
)];

pub static FABRIC: ResourceDescriptor = ResourceDescriptor::new("fabric", "Fabric", "/rest/fabrics")
    .facts_name("fabrics")
    .capabilities(Capabilities::READ_ONLY)
    .options(FABRIC_OPTIONS)
    .actions(FABRIC_ACTIONS);

const SWITCH_ACTIONS: &[ActionSpec] = &[ActionSpec::new(
    "ports_updated",
    MessageCode::PortsUpdated,
    Call::Put {
        sub: "update-ports",
        body: Payload::Field("ports"),
    },
)];

const SWITCH_OPTIONS: &[OptionSpec] = &[OptionSpec::new(
    "environmentalConfiguration",
    "switch_environmental_configuration",
    Fetch::Sub("environmentalConfiguration"),
)];

pub static SWITCH: ResourceDescriptor = ResourceDescriptor::new("switch", "Switch", "/rest/switches")
    .facts_name("switches")
    .capabilities(Capabilities {
        deletable: true,
        ..Capabilities::READ_ONLY
    })
    .options(SWITCH_OPTIONS)
    .actions(SWITCH_ACTIONS);
