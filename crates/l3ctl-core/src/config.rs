//! l3ctl.toml configuration parser.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_L3_AGENT_RPC_VERSION, TOPIC_L3_AGENT};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub l3: L3Config,
    pub rpc: RpcConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct L3Config {
    /// Protocol used to program the forwarding elements.
    pub southbound_protocol: SouthboundProtocol,
    pub router_scheduler_driver: SchedulerDriver,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub l3_agent_topic: String,
    pub agent_rpc_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SouthboundProtocol {
    #[default]
    OpenFlow,
    #[serde(rename = "OVSDB")]
    Ovsdb,
    #[serde(rename = "OP-FLEX")]
    OpFlex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerDriver {
    Chance,
    #[default]
    LeastRouters,
}

impl Default for L3Config {
    fn default() -> Self {
        Self {
            southbound_protocol: SouthboundProtocol::default(),
            router_scheduler_driver: SchedulerDriver::default(),
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            l3_agent_topic: TOPIC_L3_AGENT.to_string(),
            agent_rpc_version: DEFAULT_L3_AGENT_RPC_VERSION.to_string(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/var/lib/l3ctl/l3ctl.redb"),
        }
    }
}

impl ControllerConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ControllerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl SouthboundProtocol {
    /// Only OpenFlow has a working southbound driver.
    pub fn is_implemented(&self) -> bool {
        matches!(self, SouthboundProtocol::OpenFlow)
    }
}

impl fmt::Display for SouthboundProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SouthboundProtocol::OpenFlow => write!(f, "OpenFlow"),
            SouthboundProtocol::Ovsdb => write!(f, "OVSDB"),
            SouthboundProtocol::OpFlex => write!(f, "OP-FLEX"),
        }
    }
}

impl fmt::Display for SchedulerDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerDriver::Chance => write!(f, "chance"),
            SchedulerDriver::LeastRouters => write!(f, "least_routers"),
        }
    }
}
