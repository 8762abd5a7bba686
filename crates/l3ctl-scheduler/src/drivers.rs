//! Concrete scheduling policies.
//!
//! Both drivers share the unscheduled lookup and bind step through
//! [`RouterBinder`]; they only differ in how `select_agent` picks a host.

use std::sync::Arc;

use rand::seq::IndexedRandom;
use tracing::debug;

use l3ctl_core::{RequestContext, SchedulerDriver};
use l3ctl_state::{Agent, RouterId, RouterStore};

use crate::error::SchedulerResult;
use crate::policy::{RouterBinder, SchedulingPolicy};

/// Picks a random candidate agent.
pub struct ChanceScheduler {
    binder: RouterBinder,
}

/// Picks the candidate agent currently hosting the fewest routers.
pub struct LeastRoutersScheduler {
    binder: RouterBinder,
}

/// Build the policy named by the `router_scheduler_driver` config key.
pub fn policy_for_driver(
    driver: SchedulerDriver,
    routers: Arc<dyn RouterStore>,
) -> Arc<dyn SchedulingPolicy> {
    let binder = RouterBinder::new(routers);
    match driver {
        SchedulerDriver::Chance => Arc::new(ChanceScheduler { binder }),
        SchedulerDriver::LeastRouters => Arc::new(LeastRoutersScheduler { binder }),
    }
}

// ── ChanceScheduler ─────────────────────────────────────────────

impl ChanceScheduler {
    pub fn new(routers: Arc<dyn RouterStore>) -> Self {
        Self {
            binder: RouterBinder::new(routers),
        }
    }
}

impl SchedulingPolicy for ChanceScheduler {
    fn unscheduled_subset(
        &self,
        _ctx: &RequestContext,
        router_ids: &[RouterId],
    ) -> SchedulerResult<Vec<RouterId>> {
        self.binder.unscheduled_subset(router_ids)
    }

    fn bind(
        &self,
        _ctx: &RequestContext,
        router_ids: &[RouterId],
        agent: &Agent,
    ) -> SchedulerResult<Vec<RouterId>> {
        self.binder.bind(router_ids, agent)
    }

    fn select_agent(
        &self,
        _ctx: &RequestContext,
        router_id: &str,
        candidates: &[Agent],
    ) -> SchedulerResult<Option<Agent>> {
        let chosen = candidates.choose(&mut rand::rng()).cloned();
        debug!(%router_id, agent_id = ?chosen.as_ref().map(|a| &a.id), "chance scheduler selected agent");
        Ok(chosen)
    }
}

// ── LeastRoutersScheduler ───────────────────────────────────────

impl LeastRoutersScheduler {
    pub fn new(routers: Arc<dyn RouterStore>) -> Self {
        Self {
            binder: RouterBinder::new(routers),
        }
    }
}

impl SchedulingPolicy for LeastRoutersScheduler {
    fn unscheduled_subset(
        &self,
        _ctx: &RequestContext,
        router_ids: &[RouterId],
    ) -> SchedulerResult<Vec<RouterId>> {
        self.binder.unscheduled_subset(router_ids)
    }

    fn bind(
        &self,
        _ctx: &RequestContext,
        router_ids: &[RouterId],
        agent: &Agent,
    ) -> SchedulerResult<Vec<RouterId>> {
        self.binder.bind(router_ids, agent)
    }

    fn select_agent(
        &self,
        _ctx: &RequestContext,
        router_id: &str,
        candidates: &[Agent],
    ) -> SchedulerResult<Option<Agent>> {
        let mut best: Option<(usize, &Agent)> = None;
        for agent in candidates {
            let load = self.binder.routers().count_routers_on_agent(&agent.id)?;
            // Ties go to the first candidate.
            if best.is_none_or(|(min, _)| load < min) {
                best = Some((load, agent));
            }
        }
        let chosen = best.map(|(_, agent)| agent.clone());
        debug!(%router_id, agent_id = ?chosen.as_ref().map(|a| &a.id), "least-routers scheduler selected agent");
        Ok(chosen)
    }
}
