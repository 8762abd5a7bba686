//! Messaging seam between the notifier and the agents.
//!
//! [`Messenger`] is the contract of the messaging layer: one-way casts to a
//! single agent, router-scoped notifications, and routers-updated
//! broadcasts. Transport retries, acknowledgements and wire encoding are its
//! business; the notifier only hands messages over.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use l3ctl_core::RequestContext;
use l3ctl_state::RouterId;

use crate::error::{NotifyError, NotifyResult};

/// Address of one agent's consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CastTarget {
    pub topic: String,
    pub host: String,
    /// RPC API version the agent is expected to speak.
    pub version: String,
}

/// Delivery channel to remote agents.
pub trait Messenger: Send + Sync {
    /// One-way message to a specific agent.
    fn cast(
        &self,
        ctx: &RequestContext,
        target: &CastTarget,
        method: &str,
        payload: Value,
    ) -> NotifyResult<()>;

    /// Message scoped to the agent(s) hosting `router_id`. `operation` is
    /// an optional tag for handlers that serve several operations.
    fn notify(
        &self,
        ctx: &RequestContext,
        router_id: &str,
        method: &str,
        payload: Value,
        operation: Option<&str>,
    ) -> NotifyResult<()>;

    /// Broadcast that the given routers changed.
    fn routers_updated(
        &self,
        ctx: &RequestContext,
        router_ids: &[RouterId],
        operation: &str,
        data: Value,
    ) -> NotifyResult<()>;
}

/// A message as handed to the messaging layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentMessage {
    Cast {
        request_id: String,
        #[serde(flatten)]
        target: CastTarget,
        method: String,
        payload: Value,
    },
    RouterNotify {
        request_id: String,
        router_id: RouterId,
        method: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        operation: Option<String>,
        payload: Value,
    },
    RoutersUpdated {
        request_id: String,
        router_ids: Vec<RouterId>,
        operation: String,
        data: Value,
    },
}

/// In-process [`Messenger`] that queues every message on an unbounded
/// channel for a consumer task to drain.
#[derive(Clone, Debug)]
pub struct ChannelMessenger {
    tx: UnboundedSender<AgentMessage>,
}

// ── AgentMessage ────────────────────────────────────────────────

impl AgentMessage {
    pub fn method(&self) -> Option<&str> {
        match self {
            AgentMessage::Cast { method, .. } | AgentMessage::RouterNotify { method, .. } => {
                Some(method.as_str())
            }
            AgentMessage::RoutersUpdated { .. } => None,
        }
    }
}

// ── ChannelMessenger ────────────────────────────────────────────

impl ChannelMessenger {
    pub fn new() -> (Self, UnboundedReceiver<AgentMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, msg: AgentMessage) -> NotifyResult<()> {
        self.tx.send(msg).map_err(|_| NotifyError::ChannelClosed)
    }
}

impl Messenger for ChannelMessenger {
    fn cast(
        &self,
        ctx: &RequestContext,
        target: &CastTarget,
        method: &str,
        payload: Value,
    ) -> NotifyResult<()> {
        self.send(AgentMessage::Cast {
            request_id: ctx.request_id.clone(),
            target: target.clone(),
            method: method.to_string(),
            payload,
        })
    }

    fn notify(
        &self,
        ctx: &RequestContext,
        router_id: &str,
        method: &str,
        payload: Value,
        operation: Option<&str>,
    ) -> NotifyResult<()> {
        self.send(AgentMessage::RouterNotify {
            request_id: ctx.request_id.clone(),
            router_id: router_id.to_string(),
            method: method.to_string(),
            operation: operation.map(str::to_string),
            payload,
        })
    }

    fn routers_updated(
        &self,
        ctx: &RequestContext,
        router_ids: &[RouterId],
        operation: &str,
        data: Value,
    ) -> NotifyResult<()> {
        self.send(AgentMessage::RoutersUpdated {
            request_id: ctx.request_id.clone(),
            router_ids: router_ids.to_vec(),
            operation: operation.to_string(),
            data,
        })
    }
}
