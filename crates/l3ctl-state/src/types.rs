//! Domain types for the l3ctl state store.
//!
//! These types mirror the records the L3 engine reads from the networking
//! core: ports, subnets, port bindings, agents and routers. All types are
//! serializable to/from JSON for storage in redb tables.

use serde::{Deserialize, Serialize};

use l3ctl_core::constants::AGENT_TYPE_L3;

pub type PortId = String;
pub type SubnetId = String;
pub type NetworkId = String;
pub type AgentId = String;
pub type RouterId = String;

// ── Port ──────────────────────────────────────────────────────────

/// A virtual network interface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Port {
    pub id: PortId,
    pub network_id: NetworkId,
    /// Owner class tag, e.g. `compute:nova` or `network:router_interface`.
    pub device_owner: String,
    /// Instance or router the port is attached to.
    pub device_id: String,
    pub mac_address: String,
    pub admin_state_up: bool,
    pub fixed_ips: Vec<FixedIp>,
    /// Host the port is bound to, if any.
    #[serde(default, rename = "binding:host_id")]
    pub binding_host: Option<String>,
}

/// A fixed IP assignment of a port on one of its subnets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixedIp {
    pub subnet_id: SubnetId,
    pub ip_address: String,
}

// ── Subnet ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subnet {
    pub id: SubnetId,
    pub network_id: NetworkId,
    pub cidr: String,
    #[serde(default)]
    pub gateway_ip: Option<String>,
    pub ip_version: u8,
}

// ── Binding ───────────────────────────────────────────────────────

/// One segment of the network a port is bound to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkSegment {
    /// `vxlan`, `vlan`, `flat`, ...
    pub network_type: String,
    #[serde(default)]
    pub segmentation_id: Option<u32>,
    #[serde(default)]
    pub physical_network: Option<String>,
}

/// Persisted binding of a port on a host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortBinding {
    pub port_id: PortId,
    pub host: String,
    pub network_id: NetworkId,
    /// Bound segments, in binding order.
    pub segments: Vec<NetworkSegment>,
}

/// Network half of a bound port context.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundNetwork {
    pub id: NetworkId,
    pub segments: Vec<NetworkSegment>,
}

/// A port together with the network segments it is bound to on a host.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundPortContext {
    pub port: Port,
    pub network: BoundNetwork,
}

// ── Agent ─────────────────────────────────────────────────────────

/// A per-host forwarding agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    pub id: AgentId,
    pub host: String,
    /// Addressing channel the agent consumes from.
    pub topic: String,
    pub agent_type: String,
    pub admin_state_up: bool,
}

// ── Router ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Router {
    pub id: RouterId,
    #[serde(default)]
    pub name: String,
    /// Agent hosting the router; `None` while unscheduled.
    #[serde(default)]
    pub agent_id: Option<AgentId>,
}

impl Port {
    pub fn has_fixed_ips(&self) -> bool {
        !self.fixed_ips.is_empty()
    }

    /// Whether any of the port's fixed IPs lives on the given subnet.
    pub fn on_subnet(&self, subnet_id: &str) -> bool {
        self.fixed_ips.iter().any(|ip| ip.subnet_id == subnet_id)
    }
}

impl PortBinding {
    /// Build the composite key for the bindings table.
    pub fn table_key(&self) -> String {
        binding_key(&self.port_id, &self.host)
    }
}

/// Composite key for a `(port, host)` binding.
pub fn binding_key(port_id: &str, host: &str) -> String {
    format!("{port_id}@{host}")
}

impl Agent {
    pub fn is_l3(&self) -> bool {
        self.agent_type == AGENT_TYPE_L3
    }
}

impl Router {
    pub fn is_scheduled(&self) -> bool {
        self.agent_id.is_some()
    }
}
