//! Seed mode — loads a fixtures file into the state store.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::info;

use l3ctl_core::ControllerConfig;
use l3ctl_core::constants::AGENT_TYPE_L3;
use l3ctl_state::{Agent, Port, PortBinding, Router, StateStore, Subnet};

/// Records to load. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Fixtures {
    pub subnets: Vec<Subnet>,
    pub ports: Vec<Port>,
    pub bindings: Vec<PortBinding>,
    pub agents: Vec<AgentFixture>,
    pub routers: Vec<Router>,
}

/// An agent record; topic and type fall back to the L3 agent defaults.
#[derive(Debug, Deserialize)]
pub struct AgentFixture {
    pub id: String,
    pub host: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default = "default_agent_type")]
    pub agent_type: String,
    #[serde(default = "default_admin_state_up")]
    pub admin_state_up: bool,
}

fn default_agent_type() -> String {
    AGENT_TYPE_L3.to_string()
}

fn default_admin_state_up() -> bool {
    true
}

impl AgentFixture {
    fn into_agent(self, default_topic: &str) -> Agent {
        Agent {
            id: self.id,
            host: self.host,
            topic: self.topic.unwrap_or_else(|| default_topic.to_string()),
            agent_type: self.agent_type,
            admin_state_up: self.admin_state_up,
        }
    }
}

pub fn seed(config: &ControllerConfig, fixtures_path: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(fixtures_path)
        .with_context(|| format!("failed to read fixtures {}", fixtures_path.display()))?;
    let fixtures: Fixtures = serde_json::from_str(&content)
        .with_context(|| format!("invalid fixtures {}", fixtures_path.display()))?;

    let store = crate::open_store(config)?;
    load(&store, fixtures, &config.rpc.l3_agent_topic)
}

/// Write every fixture record to `store`.
pub fn load(store: &StateStore, fixtures: Fixtures, default_topic: &str) -> anyhow::Result<()> {
    let counts = (
        fixtures.subnets.len(),
        fixtures.ports.len(),
        fixtures.bindings.len(),
        fixtures.agents.len(),
        fixtures.routers.len(),
    );

    for subnet in &fixtures.subnets {
        store.put_subnet(subnet)?;
    }
    for port in &fixtures.ports {
        store.put_port(port)?;
    }
    for binding in &fixtures.bindings {
        store.put_binding(binding)?;
    }
    for agent in fixtures.agents {
        store.put_agent(&agent.into_agent(default_topic))?;
    }
    for router in &fixtures.routers {
        store.put_router(router)?;
    }

    let (subnets, ports, bindings, agents, routers) = counts;
    info!(subnets, ports, bindings, agents, routers, "fixtures loaded");
    Ok(())
}
