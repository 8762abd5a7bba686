//! Scheduling policy contract and the shared bind step.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use l3ctl_core::RequestContext;
use l3ctl_state::{Agent, RouterId, RouterStore};

use crate::error::SchedulerResult;

/// Capability a router scheduling policy provides.
pub trait SchedulingPolicy: Send + Sync {
    /// The subset of `router_ids` not yet bound to any agent.
    fn unscheduled_subset(
        &self,
        ctx: &RequestContext,
        router_ids: &[RouterId],
    ) -> SchedulerResult<Vec<RouterId>>;

    /// Bind `router_ids` to `agent`. Returns the routers this call bound.
    fn bind(
        &self,
        ctx: &RequestContext,
        router_ids: &[RouterId],
        agent: &Agent,
    ) -> SchedulerResult<Vec<RouterId>>;

    /// Pick the agent that should host `router_id`.
    fn select_agent(
        &self,
        ctx: &RequestContext,
        router_id: &str,
        candidates: &[Agent],
    ) -> SchedulerResult<Option<Agent>>;
}

/// Unscheduled-router lookup and compare-and-set binding shared by every
/// policy.
#[derive(Clone)]
pub struct RouterBinder {
    routers: Arc<dyn RouterStore>,
}

impl RouterBinder {
    pub fn new(routers: Arc<dyn RouterStore>) -> Self {
        Self { routers }
    }

    pub fn routers(&self) -> &Arc<dyn RouterStore> {
        &self.routers
    }

    pub fn unscheduled_subset(&self, router_ids: &[RouterId]) -> SchedulerResult<Vec<RouterId>> {
        let unique = dedup(router_ids);
        let unscheduled = self.routers.unscheduled_routers(&unique)?;
        debug!(
            candidates = unique.len(),
            unscheduled = unscheduled.len(),
            "computed unscheduled routers"
        );
        Ok(unscheduled)
    }

    /// Bind each router if it is still unscheduled. Routers another pass
    /// bound in the meantime are skipped.
    pub fn bind(&self, router_ids: &[RouterId], agent: &Agent) -> SchedulerResult<Vec<RouterId>> {
        let mut bound = Vec::new();
        for router_id in dedup(router_ids) {
            if self
                .routers
                .bind_router_if_unscheduled(&router_id, &agent.id)?
            {
                info!(%router_id, agent_id = %agent.id, host = %agent.host, "router scheduled");
                bound.push(router_id);
            } else {
                debug!(%router_id, agent_id = %agent.id, "router already scheduled, skipping");
            }
        }
        Ok(bound)
    }
}

/// Remove duplicates, keeping first occurrences in order.
fn dedup(router_ids: &[RouterId]) -> Vec<RouterId> {
    let mut seen = HashSet::new();
    router_ids
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}
