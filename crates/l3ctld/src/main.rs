//! l3ctld — the l3ctl daemon.
//!
//! Hosts the L3 controller plugin: opens the state store, wires the
//! plugin to the event bus and the agent messenger, and exposes the
//! scheduling entry points.
//!
//! # Usage
//!
//! ```text
//! l3ctld seed --config l3ctl.toml --fixtures fixtures.json
//! l3ctld run --config l3ctl.toml --events events.jsonl
//! l3ctld schedule --config l3ctl.toml --host compute-1 r1 r2
//! ```

mod run;
mod schedule;
mod seed;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use l3ctl_core::ControllerConfig;
use l3ctl_state::StateStore;

#[derive(Parser)]
#[command(name = "l3ctld", about = "L3 SDN controller daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Dispatch port events from a JSON-lines file through the plugin.
    Run {
        /// Path to l3ctl.toml.
        #[arg(long, default_value = "/etc/l3ctl/l3ctl.toml")]
        config: PathBuf,

        /// JSON-lines file of bus events.
        #[arg(long)]
        events: PathBuf,
    },

    /// Load ports, subnets, bindings, agents and routers into the store.
    Seed {
        /// Path to l3ctl.toml.
        #[arg(long, default_value = "/etc/l3ctl/l3ctl.toml")]
        config: PathBuf,

        /// JSON fixtures file.
        #[arg(long)]
        fixtures: PathBuf,
    },

    /// Schedule routers onto L3 agents.
    Schedule {
        /// Path to l3ctl.toml.
        #[arg(long, default_value = "/etc/l3ctl/l3ctl.toml")]
        config: PathBuf,

        /// Host whose L3 agent should take the routers. Without it, each
        /// router goes to whichever agent the scheduler driver picks.
        #[arg(long)]
        host: Option<String>,

        /// Candidate router ids.
        router_ids: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Run { config, events } => run::run(&load_config(&config)?, &events).await,
        Command::Seed { config, fixtures } => seed::seed(&load_config(&config)?, &fixtures),
        Command::Schedule {
            config,
            host,
            router_ids,
        } => schedule::schedule(&load_config(&config)?, host.as_deref(), &router_ids),
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,l3ctl=debug"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: &Path) -> anyhow::Result<ControllerConfig> {
    ControllerConfig::from_file(path)
        .with_context(|| format!("failed to load config {}", path.display()))
}

/// Open the on-disk store named by the config, creating its directory.
fn open_store(config: &ControllerConfig) -> anyhow::Result<StateStore> {
    let path = &config.store.path;
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create store directory {}", dir.display()))?;
    }
    let store = StateStore::open(path)
        .with_context(|| format!("failed to open state store {}", path.display()))?;
    tracing::info!(path = ?path, "state store opened");
    Ok(store)
}
