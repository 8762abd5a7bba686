//! l3ctl-notify — delivery of L3 notifications to per-host agents.
//!
//! The `AgentNotifier` turns ARP and router events into messages on a
//! [`Messenger`]. ARP notifications that name a router go to that router's
//! channel; the rest fan out to every registered L3 agent.
//!
//! # Architecture
//!
//! ```text
//! AgentNotifier
//!   ├── AgentRegistry (who are the L3 agents, where do they listen)
//!   └── Messenger (cast / notify / routers_updated)
//!       └── ChannelMessenger (in-process, tokio mpsc)
//! ```
//!
//! Delivery is fire-and-forget: a failed send is logged and dropped.

pub mod error;
pub mod messenger;
pub mod notifier;
pub mod payload;

pub use error::{NotifyError, NotifyResult};
pub use messenger::{AgentMessage, CastTarget, ChannelMessenger, Messenger};
pub use notifier::AgentNotifier;
pub use payload::{ArpNotification, ArpOperation, ArpTable};
