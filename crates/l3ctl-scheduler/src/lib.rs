//! l3ctl-scheduler — router-to-agent assignment.
//!
//! The `RouterScheduler` resolves the L3 agent a request targets and asks a
//! pluggable [`SchedulingPolicy`] which routers to bind to it.
//!
//! # Architecture
//!
//! ```text
//! RouterScheduler
//!   ├── AgentRegistry (enabled L3 agent on a host, all L3 agents)
//!   └── SchedulingPolicy
//!       ├── ChanceScheduler (uniform random agent)
//!       └── LeastRoutersScheduler (agent hosting the fewest routers)
//!           └── RouterBinder → RouterStore (compare-and-set bind)
//! ```

pub mod drivers;
pub mod error;
pub mod policy;
pub mod scheduler;

pub use drivers::{ChanceScheduler, LeastRoutersScheduler, policy_for_driver};
pub use error::{SchedulerError, SchedulerResult};
pub use policy::{RouterBinder, SchedulingPolicy};
pub use scheduler::RouterScheduler;
