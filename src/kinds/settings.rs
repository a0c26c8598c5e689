//! Appliance settings: scopes, SNMPv3, ID pools and hypervisor managers.

use reconcile::{
    ActionSpec, Call, Capabilities, Lookup, MessageCode, Payload, ReferenceField,
    ResourceDescriptor,
};

const SCOPE_ACTIONS: &[ActionSpec] = &[ActionSpec::new(
    "resource_assignments_updated",
    MessageCode::ResourceAssignmentsUpdated,
    Call::Put {
        sub: "resource-assignments",
        body: Payload::Fields(&["addedResourceUris", "removedResourceUris"]),
    },
)
.since(300)];

pub static SCOPE: ResourceDescriptor = ResourceDescriptor::new("scope", "Scope", "/rest/scopes")
    .facts_name("scopes")
    .capabilities(Capabilities::CRUD.etagged())
    .actions(SCOPE_ACTIONS);

const SNMPV3_USERS: &str = "/rest/appliance/snmpv3-trap-forwarding/users";

const SNMPV3_USER_ACTIONS: &[ActionSpec] = &[ActionSpec::new(
    "set_password",
    MessageCode::PasswordUpdated,
    Call::Put {
        sub: "",
        body: Payload::Merged,
    },
)];

pub static SNMPV3_USER: ResourceDescriptor =
    ResourceDescriptor::new("snmpv3_user", "SNMPv3 User", SNMPV3_USERS)
        .key("userName")
        .facts_name("snmpv3_users")
        .write_only(&["authenticationPassphrase", "privacyPassphrase"])
        .actions(SNMPV3_USER_ACTIONS);

const TRAP_REFERENCES: &[ReferenceField] = &[ReferenceField::new(
    "userName",
    "userId",
    Lookup::new(SNMPV3_USERS, "SNMPv3 User").by("userName"),
)
.yields("id")
.missing(MessageCode::UserNotFound)];

pub static SNMPV3_TRAP_DESTINATION: ResourceDescriptor = ResourceDescriptor::new(
    "snmpv3_trap_destination",
    "SNMPv3 Trap Destination",
    "/rest/appliance/snmpv3-trap-forwarding/destinations",
)
.key("destinationAddress")
.facts_name("snmpv3_trap_destinations")
.references(TRAP_REFERENCES);

const SUBNETS: &str = "/rest/id-pools/ipv4/subnets";

const ALLOCATED: ActionSpec = ActionSpec::new(
    "allocated",
    MessageCode::Allocated,
    Call::Put {
        sub: "allocator",
        body: Payload::Fields(&["count"]),
    },
);

const COLLECTED: ActionSpec = ActionSpec::new(
    "collected",
    MessageCode::Collected,
    Call::Put {
        sub: "collector",
        body: Payload::Fields(&["idList"]),
    },
);

const SUBNET_ACTIONS: &[ActionSpec] = &[
    ALLOCATED.fact("id_pools_ipv4_subnet_allocation"),
    COLLECTED.fact("id_pools_ipv4_subnet_collection"),
];

pub static ID_POOLS_IPV4_SUBNET: ResourceDescriptor =
    ResourceDescriptor::new("id_pools_ipv4_subnet", "IPv4 Subnet", SUBNETS)
        .key("networkId")
        .facts_name("id_pools_ipv4_subnets")
        .capabilities(Capabilities::CRUD.scoped())
        .actions(SUBNET_ACTIONS);

const RANGE_REFERENCES: &[ReferenceField] = &[ReferenceField::new(
    "subnetNetworkId",
    "subnetUri",
    Lookup::new(SUBNETS, "IPv4 Subnet").by("networkId"),
)];

const RANGE_ACTIONS: &[ActionSpec] = &[
    ALLOCATED.fact("id_pools_ipv4_range_allocation"),
    COLLECTED.fact("id_pools_ipv4_range_collection"),
];

pub static ID_POOLS_IPV4_RANGE: ResourceDescriptor =
    ResourceDescriptor::new("id_pools_ipv4_range", "IPv4 Range", "/rest/id-pools/ipv4/ranges")
        .facts_name("id_pools_ipv4_ranges")
        .references(RANGE_REFERENCES)
        .actions(RANGE_ACTIONS);

pub static HYPERVISOR_MANAGER: ResourceDescriptor = ResourceDescriptor::new(
    "hypervisor_manager",
    "Hypervisor Manager",
    "/rest/hypervisor-managers",
)
.facts_name("hypervisor_managers")
.capabilities(Capabilities::CRUD.scoped().etagged())
.write_only(&["password"]);
