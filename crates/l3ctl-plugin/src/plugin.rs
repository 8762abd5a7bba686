//! L3ControllerPlugin — the L3 service, composed from its collaborators.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info};

use l3ctl_core::constants::{PLUGIN_DESCRIPTION, PLUGIN_TYPE_L3_ROUTER_NAT};
use l3ctl_core::{ControllerConfig, RequestContext};
use l3ctl_notify::{AgentNotifier, ArpOperation, Messenger};
use l3ctl_scheduler::{RouterScheduler, policy_for_driver};
use l3ctl_state::{Agent, Port, PortStore, RouterId, StateStore};

use crate::arp::ArpNotificationBuilder;
use crate::binding::BindingResolver;
use crate::error::PluginResult;

/// A port on a subnet together with the segment it is bound to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentedPort {
    #[serde(flatten)]
    pub port: Port,
    pub segmentation_id: u32,
}

/// The L3 service plugin.
///
/// Owns no state of its own: every lookup goes through the store traits
/// and every notification through the notifier.
pub struct L3ControllerPlugin {
    ports: Arc<dyn PortStore>,
    builder: ArpNotificationBuilder,
    notifier: AgentNotifier,
    scheduler: RouterScheduler,
}

impl L3ControllerPlugin {
    /// Wire the plugin against a state store and a messenger.
    pub fn new(config: &ControllerConfig, store: StateStore, messenger: Arc<dyn Messenger>) -> Self {
        let protocol = config.l3.southbound_protocol;
        if protocol.is_implemented() {
            info!(%protocol, "using southbound {protocol} protocol");
        } else {
            error!(%protocol, "southbound {protocol} protocol not implemented yet");
        }

        let store = Arc::new(store);
        let builder = ArpNotificationBuilder::new(store.clone(), BindingResolver::new(store.clone()));
        let notifier = AgentNotifier::new(
            messenger,
            store.clone(),
            config.rpc.agent_rpc_version.clone(),
        );
        let policy = policy_for_driver(config.l3.router_scheduler_driver, store.clone());
        let scheduler = RouterScheduler::new(store.clone(), policy);
        info!(
            driver = %config.l3.router_scheduler_driver,
            rpc_version = %config.rpc.agent_rpc_version,
            "L3 controller plugin initialized"
        );

        Self::from_parts(store, builder, notifier, scheduler)
    }

    pub fn from_parts(
        ports: Arc<dyn PortStore>,
        builder: ArpNotificationBuilder,
        notifier: AgentNotifier,
        scheduler: RouterScheduler,
    ) -> Self {
        Self {
            ports,
            builder,
            notifier,
            scheduler,
        }
    }

    pub fn plugin_type(&self) -> &'static str {
        PLUGIN_TYPE_L3_ROUTER_NAT
    }

    pub fn plugin_description(&self) -> &'static str {
        PLUGIN_DESCRIPTION
    }

    // ── Port lifecycle ──────────────────────────────────────────────

    /// ARP "add" for a port that was created or came up. Returns the number
    /// of messages sent.
    pub fn add_port(&self, ctx: &RequestContext, port: &Port) -> PluginResult<usize> {
        self.notify_arp(ctx, port, ArpOperation::Add)
    }

    /// ARP "delete" for a port that is gone. Returns the number of messages
    /// sent.
    pub fn remove_port(&self, ctx: &RequestContext, port: &Port) -> PluginResult<usize> {
        self.notify_arp(ctx, port, ArpOperation::Delete)
    }

    pub fn delete_router_interface(&self, ctx: &RequestContext, port: &Port) -> bool {
        self.notifier.router_interface_deleted(ctx, port)
    }

    pub fn remove_router_from_l3_agent(
        &self,
        ctx: &RequestContext,
        agent_id: &str,
        router_id: &str,
    ) -> bool {
        self.notifier
            .router_removed_from_agent(ctx, agent_id, router_id)
    }

    fn notify_arp(
        &self,
        ctx: &RequestContext,
        port: &Port,
        operation: ArpOperation,
    ) -> PluginResult<usize> {
        match self.builder.build(ctx, port, operation)? {
            Some(notification) => Ok(self.notifier.notify_arp(ctx, &notification)),
            None => Ok(0),
        }
    }

    // ── Scheduling ──────────────────────────────────────────────────

    /// Schedule the unscheduled subset of `router_ids` onto the L3 agent
    /// on `host`.
    pub fn auto_schedule_routers(
        &self,
        ctx: &RequestContext,
        host: &str,
        router_ids: &[RouterId],
    ) -> PluginResult<bool> {
        Ok(self.scheduler.auto_schedule(ctx, host, router_ids)?)
    }

    /// Place one router on whichever L3 agent the scheduling policy picks.
    pub fn schedule_router(
        &self,
        ctx: &RequestContext,
        router_id: &str,
    ) -> PluginResult<Option<Agent>> {
        Ok(self.scheduler.schedule(ctx, router_id)?)
    }

    // ── Agent queries ───────────────────────────────────────────────

    /// Ports holding an address on `subnet_id`, each with the segmentation
    /// id of its current binding.
    pub fn ports_by_subnet(
        &self,
        ctx: &RequestContext,
        subnet_id: &str,
    ) -> PluginResult<Vec<SegmentedPort>> {
        let resolver = self.builder.resolver();
        let ports = self.ports.ports_on_subnet(ctx, subnet_id)?;
        let mut segmented = Vec::with_capacity(ports.len());
        for port in ports {
            let segmentation_id = match port.binding_host.as_deref() {
                Some(host) => resolver.segmentation_id(ctx, &port.id, host)?,
                None => 0,
            };
            segmented.push(SegmentedPort {
                port,
                segmentation_id,
            });
        }
        debug!(%subnet_id, ports = segmented.len(), "listed ports on subnet");
        Ok(segmented)
    }
}
