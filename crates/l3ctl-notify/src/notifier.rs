//! Agent notifier — routes L3 notifications to one agent or all of them.

use std::sync::Arc;

use tracing::{debug, warn};

use l3ctl_core::RequestContext;
use l3ctl_core::constants::{METHOD_ROUTER_REMOVED_FROM_AGENT, OPERATION_DEL_INTERFACE};
use l3ctl_state::{AgentRegistry, Port};

use crate::error::NotifyResult;
use crate::messenger::{CastTarget, Messenger};
use crate::payload::{
    ArpNotification, ArpPayload, ArpTable, InterfaceDeletedData, RouterRemovedPayload,
};

/// Sends ARP and router notifications to L3 agents.
///
/// Every public method is fire-and-forget: failures are logged and the
/// return value only reports how much was handed to the messenger.
pub struct AgentNotifier {
    messenger: Arc<dyn Messenger>,
    agents: Arc<dyn AgentRegistry>,
    /// RPC API version stamped on every cast.
    rpc_version: String,
}

impl AgentNotifier {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        agents: Arc<dyn AgentRegistry>,
        rpc_version: impl Into<String>,
    ) -> Self {
        Self {
            messenger,
            agents,
            rpc_version: rpc_version.into(),
        }
    }

    /// Deliver an ARP-table update.
    ///
    /// With a router id the update goes to that router's channel only;
    /// without one it is cast to every L3 agent. Returns the number of
    /// messages handed to the messenger.
    pub fn notify_arp(&self, ctx: &RequestContext, notification: &ArpNotification) -> usize {
        let method = notification.operation.method();
        match &notification.router_id {
            Some(router_id) => {
                match self.notify_router(ctx, router_id, notification) {
                    Ok(()) => {
                        debug!(%router_id, %method, port_id = %notification.arp_table.port.id, "router-scoped ARP notification sent");
                        1
                    }
                    Err(error) => {
                        warn!(%router_id, %method, %error, "failed to send router-scoped ARP notification");
                        0
                    }
                }
            }
            None => self.broadcast_arp(ctx, method, &notification.arp_table),
        }
    }

    /// Tell one agent that it no longer hosts a router.
    pub fn router_removed_from_agent(
        &self,
        ctx: &RequestContext,
        agent_id: &str,
        router_id: &str,
    ) -> bool {
        let agent = match self.agents.get_agent(&ctx.elevated(), agent_id) {
            Ok(Some(agent)) => agent,
            Ok(None) => {
                warn!(%agent_id, %router_id, "router removed from unknown agent");
                return false;
            }
            Err(error) => {
                warn!(%agent_id, %router_id, %error, "failed to look up agent");
                return false;
            }
        };

        let target = self.target(&agent.topic, &agent.host);
        let result = serde_json::to_value(RouterRemovedPayload { router_id })
            .map_err(Into::into)
            .and_then(|payload| {
                self.messenger
                    .cast(ctx, &target, METHOD_ROUTER_REMOVED_FROM_AGENT, payload)
            });
        match result {
            Ok(()) => {
                debug!(%agent_id, host = %agent.host, %router_id, "router removal sent");
                true
            }
            Err(error) => {
                warn!(%agent_id, %router_id, %error, "failed to send router removal");
                false
            }
        }
    }

    /// Broadcast that a router interface port is gone.
    pub fn router_interface_deleted(&self, ctx: &RequestContext, port: &Port) -> bool {
        let router_ids = [port.device_id.clone()];
        let result = serde_json::to_value(InterfaceDeletedData { port })
            .map_err(Into::into)
            .and_then(|data| {
                self.messenger
                    .routers_updated(ctx, &router_ids, OPERATION_DEL_INTERFACE, data)
            });
        match result {
            Ok(()) => {
                debug!(router_id = %port.device_id, port_id = %port.id, "router interface deletion sent");
                true
            }
            Err(error) => {
                warn!(router_id = %port.device_id, port_id = %port.id, %error, "failed to send router interface deletion");
                false
            }
        }
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn notify_router(
        &self,
        ctx: &RequestContext,
        router_id: &str,
        notification: &ArpNotification,
    ) -> NotifyResult<()> {
        let payload = serde_json::to_value(ArpPayload {
            router_id: Some(router_id),
            arp_table: &notification.arp_table,
        })?;
        self.messenger.notify(
            ctx,
            router_id,
            notification.operation.method(),
            payload,
            None,
        )
    }

    /// Cast the ARP table to every L3 agent, once each.
    fn broadcast_arp(&self, ctx: &RequestContext, method: &str, arp_table: &ArpTable) -> usize {
        let agents = match self.agents.get_l3_agents(&ctx.elevated()) {
            Ok(agents) => agents,
            Err(error) => {
                warn!(%method, %error, "failed to list L3 agents");
                return 0;
            }
        };

        let payload = match serde_json::to_value(ArpPayload {
            router_id: None,
            arp_table,
        }) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(%method, %error, "failed to encode ARP payload");
                return 0;
            }
        };

        let mut sent = 0;
        for agent in &agents {
            let target = self.target(&agent.topic, &agent.host);
            debug!(topic = %format!("{}.{}", agent.topic, agent.host), %method, "casting message");
            match self.messenger.cast(ctx, &target, method, payload.clone()) {
                Ok(()) => sent += 1,
                Err(error) => {
                    warn!(agent_id = %agent.id, host = %agent.host, %method, %error, "failed to cast ARP notification");
                }
            }
        }
        sent
    }

    fn target(&self, topic: &str, host: &str) -> CastTarget {
        CastTarget {
            topic: topic.to_string(),
            host: host.to_string(),
            version: self.rpc_version.clone(),
        }
    }
}
