//! Device-owner tags, agent types and RPC names shared across crates.

/// Substring carried by the owner tag of every VM-bound port.
pub const DEVICE_OWNER_COMPUTE_MARKER: &str = "compute:";

pub const DEVICE_OWNER_ROUTER_INTF: &str = "network:router_interface";
pub const DEVICE_OWNER_ROUTER_HA_INTF: &str = "network:ha_router_replicated_interface";
pub const DEVICE_OWNER_DVR_INTERFACE: &str = "network:router_interface_distributed";

/// Owner tags that mark a port as a router's attachment to a subnet.
pub const ROUTER_INTERFACE_OWNERS: [&str; 3] = [
    DEVICE_OWNER_ROUTER_INTF,
    DEVICE_OWNER_ROUTER_HA_INTF,
    DEVICE_OWNER_DVR_INTERFACE,
];

pub const AGENT_TYPE_L3: &str = "L3 agent";

pub const TOPIC_L3_AGENT: &str = "l3_agent";
pub const DEFAULT_L3_AGENT_RPC_VERSION: &str = "1.2";

pub const PLUGIN_TYPE_L3_ROUTER_NAT: &str = "L3_ROUTER_NAT";
pub const PLUGIN_DESCRIPTION: &str = "L3 SDN Controller For Neutron";

// Agent-side method names.
pub const METHOD_ADD_ARP_ENTRY: &str = "add_arp_entry";
pub const METHOD_DEL_ARP_ENTRY: &str = "del_arp_entry";
pub const METHOD_ROUTER_REMOVED_FROM_AGENT: &str = "router_removed_from_agent";

pub const OPERATION_DEL_INTERFACE: &str = "del_interface";

/// Returns whether the owner tag marks a VM-bound port.
pub fn is_compute_owner(device_owner: &str) -> bool {
    device_owner.contains(DEVICE_OWNER_COMPUTE_MARKER)
}

/// Returns whether the owner tag is one of the router-interface kinds.
pub fn is_router_interface_owner(device_owner: &str) -> bool {
    ROUTER_INTERFACE_OWNERS.contains(&device_owner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_marker_is_substring_match() {
        assert!(is_compute_owner("compute:nova"));
        assert!(is_compute_owner("compute:az-1"));
        assert!(!is_compute_owner("network:dhcp"));
        assert!(!is_compute_owner(""));
    }

    #[test]
    fn router_interface_owner_is_exact_match() {
        assert!(is_router_interface_owner("network:router_interface"));
        assert!(is_router_interface_owner("network:router_interface_distributed"));
        assert!(is_router_interface_owner("network:ha_router_replicated_interface"));
        assert!(!is_router_interface_owner("network:router_gateway"));
        assert!(!is_router_interface_owner("compute:network:router_interface"));
    }
}
