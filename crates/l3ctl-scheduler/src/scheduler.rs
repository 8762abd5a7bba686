//! Router scheduler — assigns unscheduled routers to L3 agents.

use std::sync::Arc;

use tracing::{debug, info};

use l3ctl_core::RequestContext;
use l3ctl_core::constants::AGENT_TYPE_L3;
use l3ctl_state::{Agent, AgentRegistry, RouterId};

use crate::error::SchedulerResult;
use crate::policy::SchedulingPolicy;

/// Binds routers to L3 agents through a pluggable policy.
pub struct RouterScheduler {
    agents: Arc<dyn AgentRegistry>,
    policy: Arc<dyn SchedulingPolicy>,
}

impl RouterScheduler {
    pub fn new(agents: Arc<dyn AgentRegistry>, policy: Arc<dyn SchedulingPolicy>) -> Self {
        Self { agents, policy }
    }

    /// Schedule the unscheduled subset of `router_ids` onto the L3 agent
    /// running on `host`.
    ///
    /// Returns `false` without binding anything when `host` has no enabled
    /// L3 agent.
    pub fn auto_schedule(
        &self,
        ctx: &RequestContext,
        host: &str,
        router_ids: &[RouterId],
    ) -> SchedulerResult<bool> {
        let Some(agent) = self
            .agents
            .get_enabled_agent_on_host(ctx, AGENT_TYPE_L3, host)?
        else {
            debug!(%host, "no enabled L3 agent on host, nothing scheduled");
            return Ok(false);
        };

        let unscheduled = self.policy.unscheduled_subset(ctx, router_ids)?;
        let bound = self.policy.bind(ctx, &unscheduled, &agent)?;
        info!(
            %host,
            agent_id = %agent.id,
            candidates = router_ids.len(),
            bound = bound.len(),
            "auto-scheduled routers"
        );
        Ok(true)
    }

    /// Place a single router on whichever enabled L3 agent the policy
    /// selects. Returns the hosting agent, or `None` if the router was
    /// already scheduled or no agent is available.
    pub fn schedule(&self, ctx: &RequestContext, router_id: &str) -> SchedulerResult<Option<Agent>> {
        let ids = [router_id.to_string()];
        if self.policy.unscheduled_subset(ctx, &ids)?.is_empty() {
            debug!(%router_id, "router unknown or already scheduled");
            return Ok(None);
        }

        let candidates: Vec<Agent> = self
            .agents
            .get_l3_agents(&ctx.elevated())?
            .into_iter()
            .filter(|agent| agent.admin_state_up)
            .collect();
        let Some(agent) = self.policy.select_agent(ctx, router_id, &candidates)? else {
            debug!(%router_id, "no eligible L3 agent");
            return Ok(None);
        };

        let bound = self.policy.bind(ctx, &ids, &agent)?;
        Ok((!bound.is_empty()).then_some(agent))
    }
}
