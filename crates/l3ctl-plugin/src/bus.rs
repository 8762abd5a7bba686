//! In-process publish/subscribe event bus.
//!
//! Subscribers register interest in one resource and a set of event kinds
//! and get back a receiver. Publishing never blocks: each matching
//! subscriber gets its own copy over an unbounded channel.

use tokio::sync::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::event::{BusEvent, EventKind, Resource};

struct Subscription {
    resource: Resource,
    kinds: Vec<EventKind>,
    tx: UnboundedSender<BusEvent>,
}

#[derive(Default)]
pub struct EventBus {
    subscriptions: RwLock<Vec<Subscription>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to `kinds` events on `resource`.
    pub async fn subscribe(
        &self,
        resource: Resource,
        kinds: &[EventKind],
    ) -> UnboundedReceiver<BusEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscriptions = self.subscriptions.write().await;
        subscriptions.push(Subscription {
            resource,
            kinds: kinds.to_vec(),
            tx,
        });
        debug!(%resource, ?kinds, "bus subscription added");
        rx
    }

    /// Deliver `event` to every matching subscriber. Returns how many
    /// received it. Subscribers whose receiver is gone are dropped.
    pub async fn publish(&self, event: BusEvent) -> usize {
        let mut delivered = 0;
        let mut subscriptions = self.subscriptions.write().await;
        subscriptions.retain(|sub| {
            if sub.resource != event.resource || !sub.kinds.contains(&event.event) {
                return !sub.tx.is_closed();
            }
            match sub.tx.send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });
        debug!(resource = %event.resource, event = %event.event, delivered, "event published");
        delivered
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscriptions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use l3ctl_state::Port;

    fn port() -> Port {
        Port {
            id: "p1".to_string(),
            network_id: "net-1".to_string(),
            device_owner: "compute:nova".to_string(),
            device_id: "vm-1".to_string(),
            mac_address: "fa:16:3e:00:00:01".to_string(),
            admin_state_up: true,
            fixed_ips: Vec::new(),
            binding_host: None,
        }
    }

    #[tokio::test]
    async fn publish_matches_resource_and_kind() {
        let bus = EventBus::new();
        let mut rx = bus
            .subscribe(Resource::Port, &[EventKind::AfterCreate, EventKind::AfterDelete])
            .await;

        let create = BusEvent::port(EventKind::AfterCreate, None, port());
        assert_eq!(bus.publish(create.clone()).await, 1);
        assert_eq!(rx.recv().await.unwrap(), create);

        let update = BusEvent::port(EventKind::AfterUpdate, None, port());
        assert_eq!(bus.publish(update).await, 0);

        let mut router_event = BusEvent::port(EventKind::AfterCreate, None, port());
        router_event.resource = Resource::Router;
        assert_eq!(bus.publish(router_event).await, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_subscribers_are_pruned() {
        let bus = EventBus::new();
        let rx = bus.subscribe(Resource::Port, &[EventKind::AfterCreate]).await;
        let _keep = bus.subscribe(Resource::Port, &[EventKind::AfterDelete]).await;
        drop(rx);

        let event = BusEvent::port(EventKind::AfterCreate, None, port());
        assert_eq!(bus.publish(event).await, 0);
        assert_eq!(bus.subscriber_count().await, 1);
    }
}
