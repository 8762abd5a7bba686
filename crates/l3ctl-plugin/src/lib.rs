//! l3ctl-plugin — the L3 service plugin.
//!
//! Reacts to port lifecycle events and scheduling requests:
//!
//! - **`dispatcher`** — filters port events from the bus and drives the
//!   "port added" / "port removed" paths
//! - **`arp`** — decides whether a port event yields an ARP-table update
//!   and builds it
//! - **`binding`** — resolves segmentation data for a bound port
//! - **`plugin`** — `L3ControllerPlugin`, the composition of builder,
//!   notifier and scheduler
//! - **`bus`** — in-process publish/subscribe event bus
//!
//! # Data flow
//!
//! ```text
//! EventBus ──► EventDispatcher ──► L3ControllerPlugin
//!                                    ├── ArpNotificationBuilder
//!                                    │     ├── PortStore
//!                                    │     └── BindingResolver → BindingStore
//!                                    ├── AgentNotifier → Messenger
//!                                    └── RouterScheduler → SchedulingPolicy
//! ```

pub mod arp;
pub mod binding;
pub mod bus;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod plugin;

pub use arp::ArpNotificationBuilder;
pub use binding::{BindingInfo, BindingResolver, SegmentInfo};
pub use bus::EventBus;
pub use dispatcher::{Dispatch, EventDispatcher, route};
pub use error::{PluginError, PluginResult};
pub use event::{BusEvent, EventKind, RemovedRouter, Resource};
pub use plugin::{L3ControllerPlugin, SegmentedPort};
