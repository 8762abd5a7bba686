//! Narrow read/write contracts the L3 engine depends on.
//!
//! The engine crates only see these traits, so each component can be tested
//! against `StateStore::open_in_memory()` or against a hand-rolled fake.
//! `StateStore` implements all four.

use l3ctl_core::RequestContext;

use crate::error::StateResult;
use crate::types::*;

/// Port and subnet lookups.
pub trait PortStore: Send + Sync {
    fn get_port(&self, ctx: &RequestContext, port_id: &str) -> StateResult<Option<Port>>;

    fn get_subnet(&self, ctx: &RequestContext, subnet_id: &str) -> StateResult<Option<Subnet>>;

    /// All ports holding a fixed IP on the subnet.
    fn ports_on_subnet(&self, ctx: &RequestContext, subnet_id: &str) -> StateResult<Vec<Port>>;
}

/// Port-binding lookups from the core data plane.
pub trait BindingStore: Send + Sync {
    /// Returns the bound port context for the `(port, host)` pair, or
    /// `None` if the port is not bound there.
    fn get_bound_port_context(
        &self,
        ctx: &RequestContext,
        port_id: &str,
        host: &str,
    ) -> StateResult<Option<BoundPortContext>>;
}

/// Read access to registered agents.
pub trait AgentRegistry: Send + Sync {
    /// The agent of `agent_type` on `host`, if one exists with its admin
    /// state up.
    fn get_enabled_agent_on_host(
        &self,
        ctx: &RequestContext,
        agent_type: &str,
        host: &str,
    ) -> StateResult<Option<Agent>>;

    /// Every registered L3 agent.
    fn get_l3_agents(&self, ctx: &RequestContext) -> StateResult<Vec<Agent>>;

    fn get_agent(&self, ctx: &RequestContext, agent_id: &str) -> StateResult<Option<Agent>>;
}

/// Router scheduling state.
pub trait RouterStore: Send + Sync {
    /// The subset of `router_ids` that exist and are not bound to any agent,
    /// in input order.
    fn unscheduled_routers(&self, router_ids: &[RouterId]) -> StateResult<Vec<RouterId>>;

    /// Binds the router to the agent only if it is still unscheduled.
    ///
    /// Returns `true` if this call performed the bind.
    fn bind_router_if_unscheduled(&self, router_id: &str, agent_id: &str) -> StateResult<bool>;

    fn count_routers_on_agent(&self, agent_id: &str) -> StateResult<usize>;
}
