//! Event dispatcher — turns port events from the bus into plugin calls.
//!
//! Routing is split in two: [`route`] is a pure decision over the event
//! payload, and [`EventDispatcher::handle`] executes that decision against
//! the plugin. Re-delivering an event recomputes the same notifications.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use l3ctl_core::RequestContext;
use l3ctl_core::constants::is_router_interface_owner;
use l3ctl_state::Port;

use crate::bus::EventBus;
use crate::event::{BusEvent, EventKind, RemovedRouter, Resource};
use crate::plugin::L3ControllerPlugin;

/// Port events the dispatcher subscribes to.
pub const SUBSCRIBED_EVENTS: [EventKind; 3] = [
    EventKind::AfterCreate,
    EventKind::AfterUpdate,
    EventKind::AfterDelete,
];

/// What to do with one bus event.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Nothing to do; carries the reason for the debug log.
    Ignore(&'static str),
    /// A create/update without a caller context to correlate it with.
    MissingContext,
    PortAdded {
        ctx: RequestContext,
        port: Port,
    },
    PortRemoved {
        ctx: RequestContext,
        port: Port,
        removed_routers: Vec<RemovedRouter>,
    },
}

/// Decide how to handle `event`.
pub fn route(event: &BusEvent) -> Dispatch {
    if event.resource != Resource::Port {
        return Dispatch::Ignore("not a port event");
    }
    let Some(port) = &event.port else {
        return Dispatch::Ignore("event carries no port");
    };

    match event.event {
        EventKind::AfterCreate | EventKind::AfterUpdate => {
            let Some(ctx) = &event.context else {
                return Dispatch::MissingContext;
            };
            if !(event.mac_address_updated || event.update_device_up) {
                return Dispatch::Ignore("neither MAC address nor device state changed");
            }
            Dispatch::PortAdded {
                ctx: ctx.clone(),
                port: port.clone(),
            }
        }
        EventKind::AfterDelete => Dispatch::PortRemoved {
            ctx: event.context.clone().unwrap_or_else(RequestContext::admin),
            port: port.clone(),
            removed_routers: event.removed_routers.clone(),
        },
        EventKind::BeforeDelete => Dispatch::Ignore("before_delete is not handled"),
    }
}

/// Subscribes to port events and drives the plugin for each one.
pub struct EventDispatcher {
    plugin: Arc<L3ControllerPlugin>,
}

impl EventDispatcher {
    pub fn new(plugin: Arc<L3ControllerPlugin>) -> Self {
        Self { plugin }
    }

    /// Register for `Port × {AfterCreate, AfterUpdate, AfterDelete}`.
    pub async fn subscribe(&self, bus: &EventBus) -> UnboundedReceiver<BusEvent> {
        bus.subscribe(Resource::Port, &SUBSCRIBED_EVENTS).await
    }

    /// Handle one event. Returns the number of agent messages sent.
    ///
    /// Failures are logged and the event dropped; nothing here propagates.
    pub fn handle(&self, event: &BusEvent) -> usize {
        match route(event) {
            Dispatch::Ignore(reason) => {
                debug!(resource = %event.resource, event = %event.event, reason, "event ignored");
                0
            }
            Dispatch::MissingContext => {
                warn!(
                    resource = %event.resource,
                    event = %event.event,
                    port_id = ?event.port.as_ref().map(|p| &p.id),
                    "no request context for event, dropping"
                );
                0
            }
            Dispatch::PortAdded { ctx, port } => match self.plugin.add_port(&ctx, &port) {
                Ok(sent) => sent,
                Err(e) => {
                    error!(port_id = %port.id, request_id = %ctx.request_id, error = %e, "failed to handle port add");
                    0
                }
            },
            Dispatch::PortRemoved {
                ctx,
                port,
                removed_routers,
            } => self.port_removed(&ctx, &port, &removed_routers),
        }
    }

    fn port_removed(
        &self,
        ctx: &RequestContext,
        port: &Port,
        removed_routers: &[RemovedRouter],
    ) -> usize {
        let mut sent = match self.plugin.remove_port(ctx, port) {
            Ok(sent) => sent,
            Err(e) => {
                error!(port_id = %port.id, request_id = %ctx.request_id, error = %e, "failed to handle port removal");
                0
            }
        };

        if is_router_interface_owner(&port.device_owner)
            && self.plugin.delete_router_interface(ctx, port)
        {
            sent += 1;
        }

        for removed in removed_routers {
            if self
                .plugin
                .remove_router_from_l3_agent(ctx, &removed.agent_id, &removed.router_id)
            {
                sent += 1;
            }
        }
        debug!(port_id = %port.id, removed_routers = removed_routers.len(), sent, "port removal handled");
        sent
    }

    /// Receive loop: every event is handled on the blocking pool so
    /// independent events proceed concurrently. Stops when the bus side
    /// closes or the shutdown signal fires, after in-flight events finish.
    ///
    /// Returns the number of events handled.
    pub async fn run(
        self: Arc<Self>,
        mut events: UnboundedReceiver<BusEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> usize {
        info!("event dispatcher started");
        let mut workers = JoinSet::new();
        let mut handled = 0;

        loop {
            tokio::select! {
                received = events.recv() => {
                    let Some(event) = received else {
                        debug!("event bus closed");
                        break;
                    };
                    let dispatcher = self.clone();
                    workers.spawn_blocking(move || dispatcher.handle(&event));
                }
                Some(joined) = workers.join_next(), if !workers.is_empty() => {
                    handled += reap(joined);
                }
                _ = shutdown.changed() => {
                    info!("event dispatcher shutting down");
                    break;
                }
            }
        }

        while let Some(joined) = workers.join_next().await {
            handled += reap(joined);
        }
        info!(handled, "event dispatcher stopped");
        handled
    }
}

fn reap(joined: Result<usize, tokio::task::JoinError>) -> usize {
    match joined {
        Ok(_) => 1,
        Err(e) => {
            error!(error = %e, "event worker panicked");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use l3ctl_core::ControllerConfig;
    use l3ctl_core::constants::AGENT_TYPE_L3;
    use l3ctl_notify::{AgentMessage, ChannelMessenger};
    use l3ctl_state::{Agent, FixedIp, StateStore, Subnet};

    fn ctx() -> RequestContext {
        RequestContext::new("req-1", Some("tenant-a".to_string()))
    }

    fn port(id: &str, device_owner: &str, device_id: &str) -> Port {
        Port {
            id: id.to_string(),
            network_id: "net-1".to_string(),
            device_owner: device_owner.to_string(),
            device_id: device_id.to_string(),
            mac_address: "fa:16:3e:00:00:01".to_string(),
            admin_state_up: true,
            fixed_ips: vec![FixedIp {
                subnet_id: "s1".to_string(),
                ip_address: "10.0.0.5".to_string(),
            }],
            binding_host: None,
        }
    }

    fn seeded_store() -> StateStore {
        let store = StateStore::open_in_memory().unwrap();
        store
            .put_subnet(&Subnet {
                id: "s1".to_string(),
                network_id: "net-1".to_string(),
                cidr: "10.0.0.0/24".to_string(),
                gateway_ip: Some("10.0.0.1".to_string()),
                ip_version: 4,
            })
            .unwrap();
        for (id, host) in [("a1", "host-1"), ("a3", "host-3")] {
            store
                .put_agent(&Agent {
                    id: id.to_string(),
                    host: host.to_string(),
                    topic: "l3_agent".to_string(),
                    agent_type: AGENT_TYPE_L3.to_string(),
                    admin_state_up: true,
                })
                .unwrap();
        }
        store
    }

    fn dispatcher(
        store: &StateStore,
    ) -> (
        Arc<EventDispatcher>,
        UnboundedReceiver<AgentMessage>,
    ) {
        let (messenger, rx) = ChannelMessenger::new();
        let plugin =
            L3ControllerPlugin::new(&ControllerConfig::default(), store.clone(), Arc::new(messenger));
        (Arc::new(EventDispatcher::new(Arc::new(plugin))), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<AgentMessage>) -> Vec<AgentMessage> {
        let mut msgs = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            msgs.push(msg);
        }
        msgs
    }

    // ── route ───────────────────────────────────────────────────────

    #[test]
    fn non_port_resources_are_ignored() {
        let mut event = BusEvent::port(EventKind::AfterCreate, Some(ctx()), port("p1", "compute:nova", "vm-1"));
        event.resource = Resource::Network;
        event.mac_address_updated = true;
        assert!(matches!(route(&event), Dispatch::Ignore(_)));
    }

    #[test]
    fn create_without_flags_is_ignored() {
        let event = BusEvent::port(EventKind::AfterCreate, Some(ctx()), port("p1", "compute:nova", "vm-1"));
        assert!(matches!(route(&event), Dispatch::Ignore(_)));
    }

    #[test]
    fn update_device_up_routes_to_add() {
        let mut event = BusEvent::port(EventKind::AfterUpdate, Some(ctx()), port("p1", "compute:nova", "vm-1"));
        event.update_device_up = true;
        assert!(matches!(route(&event), Dispatch::PortAdded { port, .. } if port.id == "p1"));
    }

    #[test]
    fn create_without_context_is_missing_context() {
        let mut event = BusEvent::port(EventKind::AfterCreate, None, port("p1", "compute:nova", "vm-1"));
        event.mac_address_updated = true;
        assert_eq!(route(&event), Dispatch::MissingContext);
    }

    #[test]
    fn delete_always_routes_to_remove() {
        let mut event = BusEvent::port(EventKind::AfterDelete, None, port("p2", "network:router_interface", "r7"));
        event.removed_routers = vec![RemovedRouter {
            router_id: "r7".to_string(),
            agent_id: "a3".to_string(),
        }];
        match route(&event) {
            Dispatch::PortRemoved {
                ctx,
                removed_routers,
                ..
            } => {
                assert!(ctx.is_admin);
                assert_eq!(removed_routers.len(), 1);
            }
            other => panic!("unexpected dispatch: {other:?}"),
        }
    }

    #[test]
    fn before_delete_is_ignored() {
        let event = BusEvent::port(EventKind::BeforeDelete, Some(ctx()), port("p1", "compute:nova", "vm-1"));
        assert!(matches!(route(&event), Dispatch::Ignore(_)));
    }

    // ── handle ──────────────────────────────────────────────────────

    #[test]
    fn created_vm_port_broadcasts_add_with_subnet() {
        let store = seeded_store();
        let p1 = port("p1", "compute:nova", "vm-1");
        store.put_port(&p1).unwrap();
        let (dispatcher, mut rx) = dispatcher(&store);

        let mut event = BusEvent::port(EventKind::AfterCreate, Some(ctx()), p1);
        event.mac_address_updated = true;
        assert_eq!(dispatcher.handle(&event), 2);

        let msgs = drain(&mut rx);
        assert_eq!(msgs.len(), 2);
        for msg in msgs {
            let AgentMessage::Cast { method, payload, .. } = msg else {
                panic!("expected cast");
            };
            assert_eq!(method, "add_arp_entry");
            assert_eq!(payload["router_id"], json!(0));
            assert_eq!(payload["arp_table"]["subnets"][0]["id"], json!("s1"));
            assert_eq!(payload["arp_table"]["subnets"][0]["cidr"], json!("10.0.0.0/24"));
        }
    }

    #[test]
    fn deleted_router_interface_notifies_removal() {
        let store = seeded_store();
        let (dispatcher, mut rx) = dispatcher(&store);

        let mut event = BusEvent::port(EventKind::AfterDelete, Some(ctx()), port("p2", "network:router_interface", "r7"));
        event.removed_routers = vec![RemovedRouter {
            router_id: "r7".to_string(),
            agent_id: "a3".to_string(),
        }];
        assert_eq!(dispatcher.handle(&event), 2);

        let msgs = drain(&mut rx);
        assert_eq!(msgs.len(), 2);
        match &msgs[0] {
            AgentMessage::RoutersUpdated {
                router_ids,
                operation,
                data,
                ..
            } => {
                assert_eq!(router_ids, &vec!["r7".to_string()]);
                assert_eq!(operation, "del_interface");
                assert_eq!(data["port"]["id"], json!("p2"));
            }
            other => panic!("unexpected message: {other:?}"),
        }
        match &msgs[1] {
            AgentMessage::Cast {
                target,
                method,
                payload,
                ..
            } => {
                assert_eq!(target.host, "host-3");
                assert_eq!(method, "router_removed_from_agent");
                assert_eq!(payload, &json!({"router_id": "r7"}));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn deleted_vm_port_broadcasts_delete() {
        let store = seeded_store();
        let (dispatcher, mut rx) = dispatcher(&store);

        let event = BusEvent::port(EventKind::AfterDelete, Some(ctx()), port("p1", "compute:nova", "vm-1"));
        assert_eq!(dispatcher.handle(&event), 2);
        for msg in drain(&mut rx) {
            let AgentMessage::Cast { method, payload, .. } = msg else {
                panic!("expected cast");
            };
            assert_eq!(method, "del_arp_entry");
            assert_eq!(payload["arp_table"]["segmentation_id"], json!(0));
        }
    }

    #[test]
    fn add_for_vanished_port_is_dropped() {
        let store = seeded_store();
        let (dispatcher, mut rx) = dispatcher(&store);

        let mut event = BusEvent::port(EventKind::AfterUpdate, Some(ctx()), port("p1", "compute:nova", "vm-1"));
        event.mac_address_updated = true;
        assert_eq!(dispatcher.handle(&event), 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn redelivery_recomputes_same_messages() {
        let store = seeded_store();
        let p1 = port("p1", "compute:nova", "vm-1");
        store.put_port(&p1).unwrap();
        let (dispatcher, mut rx) = dispatcher(&store);

        let mut event = BusEvent::port(EventKind::AfterCreate, Some(ctx()), p1);
        event.mac_address_updated = true;
        dispatcher.handle(&event);
        let first = drain(&mut rx);
        dispatcher.handle(&event);
        assert_eq!(drain(&mut rx), first);
    }

    // ── run ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn run_drains_bus_until_closed() {
        let store = seeded_store();
        let p1 = port("p1", "compute:nova", "vm-1");
        store.put_port(&p1).unwrap();
        let (dispatcher, mut rx) = dispatcher(&store);

        let bus = EventBus::new();
        let events = dispatcher.subscribe(&bus).await;
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut create = BusEvent::port(EventKind::AfterCreate, Some(ctx()), p1.clone());
        create.mac_address_updated = true;
        assert_eq!(bus.publish(create).await, 1);
        assert_eq!(bus.publish(BusEvent::port(EventKind::AfterDelete, None, p1)).await, 1);
        assert_eq!(
            bus.publish(BusEvent::port(EventKind::BeforeDelete, None, port("p1", "compute:nova", "vm-1")))
                .await,
            0
        );
        drop(bus);

        let handled = dispatcher.run(events, shutdown_rx).await;
        assert_eq!(handled, 2);

        let methods: Vec<String> = drain(&mut rx)
            .iter()
            .filter_map(|m| m.method().map(str::to_string))
            .collect();
        assert_eq!(methods.iter().filter(|m| *m == "add_arp_entry").count(), 2);
        assert_eq!(methods.iter().filter(|m| *m == "del_arp_entry").count(), 2);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let store = seeded_store();
        let (dispatcher, _rx) = dispatcher(&store);

        let bus = EventBus::new();
        let events = dispatcher.subscribe(&bus).await;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(dispatcher.run(events, shutdown_rx));
        shutdown_tx.send(true).unwrap();
        assert_eq!(task.await.unwrap(), 0);
    }
}
