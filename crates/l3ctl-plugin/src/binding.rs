//! Binding resolver — segmentation data for a port bound on a host.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use l3ctl_core::RequestContext;
use l3ctl_state::{BindingStore, FixedIp, NetworkId, NetworkSegment, PortId};

use crate::error::PluginResult;

/// Type, tag and physical network of the first bound segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentInfo {
    pub network_type: String,
    pub segmentation_id: Option<u32>,
    pub physical_network: Option<String>,
}

/// Binding metadata of a port on one host.
///
/// `segment` is `None` for the "empty" value returned when a binding exists
/// but carries no readable segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindingInfo {
    pub device: String,
    pub network_id: NetworkId,
    pub port_id: PortId,
    pub mac_address: String,
    pub admin_state_up: bool,
    #[serde(flatten)]
    pub segment: Option<SegmentInfo>,
    pub fixed_ips: Vec<FixedIp>,
    pub device_owner: String,
}

impl BindingInfo {
    /// The segment tag, or 0 when none has been assigned yet.
    pub fn segmentation_id(&self) -> u32 {
        self.segment
            .as_ref()
            .and_then(|segment| segment.segmentation_id)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.segment.is_none()
    }
}

impl From<&NetworkSegment> for SegmentInfo {
    fn from(segment: &NetworkSegment) -> Self {
        Self {
            network_type: segment.network_type.clone(),
            segmentation_id: segment.segmentation_id,
            physical_network: segment.physical_network.clone(),
        }
    }
}

/// Looks up bound port contexts and extracts [`BindingInfo`] from them.
#[derive(Clone)]
pub struct BindingResolver {
    bindings: Arc<dyn BindingStore>,
}

impl BindingResolver {
    pub fn new(bindings: Arc<dyn BindingStore>) -> Self {
        Self { bindings }
    }

    /// Resolve the binding of `port_id` on `host`.
    ///
    /// Returns `None` when the port is not bound there. Only the first bound
    /// segment is consulted.
    pub fn resolve(
        &self,
        ctx: &RequestContext,
        port_id: &str,
        host: &str,
    ) -> PluginResult<Option<BindingInfo>> {
        let Some(bound) = self.bindings.get_bound_port_context(ctx, port_id, host)? else {
            warn!(%port_id, %host, "no bound port context for port on host");
            return Ok(None);
        };

        let segment = bound.network.segments.first().map(SegmentInfo::from);
        if segment.is_none() {
            warn!(%port_id, %host, network_id = %bound.network.id, "bound port has no network segment");
        }

        let port = bound.port;
        let info = BindingInfo {
            device: host.to_string(),
            network_id: port.network_id,
            port_id: port.id,
            mac_address: port.mac_address,
            admin_state_up: port.admin_state_up,
            segment,
            fixed_ips: port.fixed_ips,
            device_owner: port.device_owner,
        };
        debug!(%port_id, %host, segmentation_id = info.segmentation_id(), "resolved port binding");
        Ok(Some(info))
    }

    /// Segmentation id of `port_id` on `host`, 0 when unbound or untagged.
    pub fn segmentation_id(
        &self,
        ctx: &RequestContext,
        port_id: &str,
        host: &str,
    ) -> PluginResult<u32> {
        Ok(self
            .resolve(ctx, port_id, host)?
            .map_or(0, |info| info.segmentation_id()))
    }
}
