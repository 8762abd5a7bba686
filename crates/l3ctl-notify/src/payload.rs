//! Notification payloads observed by remote agents.

use serde::{Serialize, Serializer};

use l3ctl_core::constants::{METHOD_ADD_ARP_ENTRY, METHOD_DEL_ARP_ENTRY};
use l3ctl_state::{Port, RouterId, Subnet};

/// Direction of an ARP-table update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpOperation {
    Add,
    Delete,
}

/// A port enriched with its subnets and segmentation id, as pushed to
/// agents for their ARP tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArpTable {
    #[serde(flatten)]
    pub port: Port,
    pub subnets: Vec<Subnet>,
    /// 0 when no segment tag is known.
    pub segmentation_id: u32,
}

/// One ARP-table update, built per port event and consumed immediately.
#[derive(Debug, Clone, PartialEq)]
pub struct ArpNotification {
    /// Router whose agent should receive the update. `None` broadcasts
    /// to every L3 agent.
    pub router_id: Option<RouterId>,
    pub arp_table: ArpTable,
    pub operation: ArpOperation,
}

/// Wire shape of an ARP message: `{router_id, arp_table}`.
#[derive(Debug, Serialize)]
pub(crate) struct ArpPayload<'a> {
    #[serde(serialize_with = "router_id_or_zero")]
    pub router_id: Option<&'a str>,
    pub arp_table: &'a ArpTable,
}

/// Wire shape of a router-removed message.
#[derive(Debug, Serialize)]
pub(crate) struct RouterRemovedPayload<'a> {
    pub router_id: &'a str,
}

/// Data attached to a `del_interface` routers-updated event.
#[derive(Debug, Serialize)]
pub(crate) struct InterfaceDeletedData<'a> {
    pub port: &'a Port,
}

impl ArpOperation {
    /// Agent-side method handling this operation.
    pub fn method(&self) -> &'static str {
        match self {
            ArpOperation::Add => METHOD_ADD_ARP_ENTRY,
            ArpOperation::Delete => METHOD_DEL_ARP_ENTRY,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArpOperation::Add => "add",
            ArpOperation::Delete => "del",
        }
    }
}

impl std::fmt::Display for ArpOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ArpNotification {
    pub fn is_broadcast(&self) -> bool {
        self.router_id.is_none()
    }
}

// Agents expect a literal 0 when no router is associated.
fn router_id_or_zero<S: Serializer>(
    router_id: &Option<&str>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match router_id {
        Some(id) => serializer.serialize_str(id),
        None => serializer.serialize_u8(0),
    }
}
