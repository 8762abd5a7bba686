//! ARP notification builder.
//!
//! Decides whether a port event should update agents' ARP tables and, if
//! so, builds the [`ArpNotification`] for it. Only VM ports holding at
//! least one fixed IP qualify.

use std::sync::Arc;

use tracing::debug;

use l3ctl_core::RequestContext;
use l3ctl_core::constants::{is_compute_owner, is_router_interface_owner};
use l3ctl_notify::{ArpNotification, ArpOperation, ArpTable};
use l3ctl_state::{Port, PortStore, RouterId, Subnet};

use crate::binding::BindingResolver;
use crate::error::{PluginError, PluginResult};

pub struct ArpNotificationBuilder {
    ports: Arc<dyn PortStore>,
    resolver: BindingResolver,
}

/// VM-owned and holding at least one fixed IP.
pub fn is_vm_port_with_ip_addresses(port: &Port) -> bool {
    is_compute_owner(&port.device_owner) && port.has_fixed_ips()
}

/// The router a port belongs to, if the port is a router interface.
pub fn router_id_for(port: &Port) -> Option<RouterId> {
    is_router_interface_owner(&port.device_owner).then(|| port.device_id.clone())
}

impl ArpNotificationBuilder {
    pub fn new(ports: Arc<dyn PortStore>, resolver: BindingResolver) -> Self {
        Self { ports, resolver }
    }

    pub fn resolver(&self) -> &BindingResolver {
        &self.resolver
    }

    /// Build the notification for `port`, or `None` if the port does not
    /// affect ARP tables.
    pub fn build(
        &self,
        ctx: &RequestContext,
        port: &Port,
        operation: ArpOperation,
    ) -> PluginResult<Option<ArpNotification>> {
        if !is_vm_port_with_ip_addresses(port) {
            debug!(port_id = %port.id, device_owner = %port.device_owner, %operation, "port not eligible for ARP update");
            return Ok(None);
        }

        let notification = match operation {
            ArpOperation::Add => self.build_add(ctx, &port.id)?,
            // The binding is gone with the port; only the snapshot is left.
            ArpOperation::Delete => ArpNotification {
                router_id: None,
                arp_table: ArpTable {
                    port: port.clone(),
                    subnets: self.subnets_of(ctx, port)?,
                    segmentation_id: 0,
                },
                operation,
            },
        };
        Ok(Some(notification))
    }

    fn build_add(&self, ctx: &RequestContext, port_id: &str) -> PluginResult<ArpNotification> {
        let port = self
            .ports
            .get_port(ctx, port_id)?
            .ok_or_else(|| PluginError::PortNotFound(port_id.to_string()))?;

        let subnets = self.subnets_of(ctx, &port)?;
        let router_id = router_id_for(&port);
        let segmentation_id = match port.binding_host.as_deref() {
            Some(host) => self.resolver.segmentation_id(ctx, &port.id, host)?,
            None => 0,
        };

        debug!(
            port_id = %port.id,
            router_id = ?router_id,
            segmentation_id,
            subnets = subnets.len(),
            "built ARP add notification"
        );
        Ok(ArpNotification {
            router_id,
            arp_table: ArpTable {
                port,
                subnets,
                segmentation_id,
            },
            operation: ArpOperation::Add,
        })
    }

    /// Subnets of the port's fixed IPs, in fixed-IP order.
    fn subnets_of(&self, ctx: &RequestContext, port: &Port) -> PluginResult<Vec<Subnet>> {
        port.fixed_ips
            .iter()
            .map(|ip| {
                self.ports
                    .get_subnet(ctx, &ip.subnet_id)?
                    .ok_or_else(|| PluginError::SubnetNotFound(ip.subnet_id.clone()))
            })
            .collect()
    }
}
