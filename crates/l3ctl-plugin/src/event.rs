//! Events delivered by the platform's event bus.

use std::fmt;

use serde::{Deserialize, Serialize};

use l3ctl_core::RequestContext;
use l3ctl_state::{AgentId, Port, RouterId};

/// Kind of resource an event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Port,
    Router,
    Network,
    Subnet,
}

/// Lifecycle point an event was emitted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    BeforeDelete,
    AfterCreate,
    AfterUpdate,
    AfterDelete,
}

/// A router detached from an agent as a side effect of a port delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedRouter {
    pub router_id: RouterId,
    pub agent_id: AgentId,
}

/// One event as published on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusEvent {
    pub resource: Resource,
    pub event: EventKind,
    /// Context of the originating request; absent when the emitter could
    /// not correlate one.
    #[serde(default)]
    pub context: Option<RequestContext>,
    #[serde(default)]
    pub port: Option<Port>,
    #[serde(default)]
    pub mac_address_updated: bool,
    #[serde(default)]
    pub update_device_up: bool,
    #[serde(default)]
    pub removed_routers: Vec<RemovedRouter>,
}

impl BusEvent {
    /// A port event with no flags set.
    pub fn port(event: EventKind, context: Option<RequestContext>, port: Port) -> Self {
        Self {
            resource: Resource::Port,
            event,
            context,
            port: Some(port),
            mac_address_updated: false,
            update_device_up: false,
            removed_routers: Vec::new(),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Port => write!(f, "port"),
            Resource::Router => write!(f, "router"),
            Resource::Network => write!(f, "network"),
            Resource::Subnet => write!(f, "subnet"),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::BeforeDelete => write!(f, "before_delete"),
            EventKind::AfterCreate => write!(f, "after_create"),
            EventKind::AfterUpdate => write!(f, "after_update"),
            EventKind::AfterDelete => write!(f, "after_delete"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_delete_event() {
        let json = r#"{
            "resource": "port",
            "event": "after_delete",
            "port": {
                "id": "p2",
                "network_id": "net-1",
                "device_owner": "network:router_interface",
                "device_id": "r7",
                "mac_address": "fa:16:3e:00:00:02",
                "admin_state_up": true,
                "fixed_ips": []
            },
            "removed_routers": [{"router_id": "r7", "agent_id": "a3"}]
        }"#;
        let event: BusEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.resource, Resource::Port);
        assert_eq!(event.event, EventKind::AfterDelete);
        assert!(event.context.is_none());
        assert!(!event.mac_address_updated);
        assert_eq!(event.removed_routers[0].agent_id, "a3");
        assert!(event.port.unwrap().binding_host.is_none());
    }
}
