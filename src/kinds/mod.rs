//! Resource-kind catalog.
//!
//! One `'static` descriptor per kind. Adding a kind means declaring a
//! descriptor in the right group module and listing it in [`all`].

mod networking;
mod servers;
mod settings;
mod storage;
mod streamer;

use reconcile::{Endpoint, ResourceDescriptor};

pub use networking::{
    ETHERNET_NETWORK, FABRIC, FC_NETWORK, FCOE_NETWORK, LOGICAL_INTERCONNECT_GROUP, NETWORK_SET,
    SWITCH,
};
pub use servers::{
    DRIVE_ENCLOSURE, ENCLOSURE, ENCLOSURE_GROUP, RACK, SAS_INTERCONNECT, SERVER_HARDWARE,
    SERVER_PROFILE, SERVER_PROFILE_TEMPLATE,
};
pub use settings::{
    HYPERVISOR_MANAGER, ID_POOLS_IPV4_RANGE, ID_POOLS_IPV4_SUBNET, SCOPE, SNMPV3_TRAP_DESTINATION,
    SNMPV3_USER,
};
pub use storage::{STORAGE_POOL, STORAGE_SYSTEM, STORAGE_VOLUME_ATTACHMENT, VOLUME};
pub use streamer::{BUILD_PLAN, DEPLOYMENT_PLAN, OS_VOLUME, PLAN_SCRIPT};

static CATALOG: &[&ResourceDescriptor] = &[
    &FC_NETWORK,
    &FCOE_NETWORK,
    &ETHERNET_NETWORK,
    &NETWORK_SET,
    &LOGICAL_INTERCONNECT_GROUP,
    &FABRIC,
    &SWITCH,
    &ENCLOSURE,
    &ENCLOSURE_GROUP,
    &SERVER_HARDWARE,
    &SERVER_PROFILE,
    &SERVER_PROFILE_TEMPLATE,
    &RACK,
    &SAS_INTERCONNECT,
    &DRIVE_ENCLOSURE,
    &STORAGE_SYSTEM,
    &STORAGE_POOL,
    &VOLUME,
    &STORAGE_VOLUME_ATTACHMENT,
    &SCOPE,
    &SNMPV3_USER,
    &SNMPV3_TRAP_DESTINATION,
    &ID_POOLS_IPV4_SUBNET,
    &ID_POOLS_IPV4_RANGE,
    &HYPERVISOR_MANAGER,
    &DEPLOYMENT_PLAN,
    &BUILD_PLAN,
    &PLAN_SCRIPT,
    &OS_VOLUME,
];

/// Every kind, in catalog order.
pub fn all() -> &'static [&'static ResourceDescriptor] {
    CATALOG
}

/// Look a kind up by name. Dashes are accepted in place of underscores.
pub fn find(kind: &str) -> Option<&'static ResourceDescriptor> {
    let wanted = kind.trim().replace('-', "_");
    CATALOG
        .iter()
        .copied()
        .find(|descriptor| descriptor.kind == wanted)
}

/// Kinds served by `endpoint`.
pub fn served_by(endpoint: Endpoint) -> impl Iterator<Item = &'static ResourceDescriptor> {
    CATALOG
        .iter()
        .copied()
        .filter(move |descriptor| descriptor.endpoint == endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_find_accepts_dashes() {
        assert_eq!(find("fc-network").map(|d| d.path), Some("/rest/fc-networks"));
        assert_eq!(find("fc_network").map(|d| d.kind), Some("fc_network"));
        assert!(find("toaster").is_none());
    }

    #[test]
    fn test_kind_names_are_unique() {
        let mut seen = HashSet::new();
        for descriptor in all() {
            assert!(seen.insert(descriptor.kind), "duplicate kind {}", descriptor.kind);
        }
    }

    #[test]
    fn test_action_states_do_not_shadow_builtins() {
        for descriptor in all() {
            for action in descriptor.actions {
                assert_ne!(action.state, "present", "{}", descriptor.kind);
                assert_ne!(action.state, "absent", "{}", descriptor.kind);
            }
        }
    }

    #[test]
    fn test_option_names_are_unique_per_kind() {
        for descriptor in all() {
            let mut seen = HashSet::new();
            for option in descriptor.options {
                assert!(seen.insert(option.name), "{}: {}", descriptor.kind, option.name);
            }
        }
    }

    #[test]
    fn test_image_streamer_kinds() {
        let kinds: Vec<&str> = served_by(Endpoint::ImageStreamer).map(|d| d.kind).collect();
        assert!(kinds.contains(&"deployment_plan"));
        assert!(kinds.contains(&"os_volume"));
        assert!(!kinds.contains(&"fc_network"));
    }
}
