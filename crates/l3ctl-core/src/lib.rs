//! l3ctl-core — shared vocabulary for the l3ctl workspace.
//!
//! Holds the controller configuration (`l3ctl.toml`), the device-owner and
//! agent-type constants used to classify ports and agents, and the request
//! context threaded through every collaborator call.

pub mod config;
pub mod constants;
pub mod context;

pub use config::{ControllerConfig, SchedulerDriver, SouthboundProtocol};
pub use context::RequestContext;
