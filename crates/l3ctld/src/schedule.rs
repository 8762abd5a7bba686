//! Schedule mode — binds routers to L3 agents from the command line.

use std::sync::Arc;

use tracing::info;

use l3ctl_core::{ControllerConfig, RequestContext};
use l3ctl_notify::ChannelMessenger;
use l3ctl_plugin::L3ControllerPlugin;

pub fn schedule(
    config: &ControllerConfig,
    host: Option<&str>,
    router_ids: &[String],
) -> anyhow::Result<()> {
    let store = crate::open_store(config)?;
    // Scheduling sends no agent messages; the receiver only keeps the
    // channel open.
    let (messenger, _messages) = ChannelMessenger::new();
    let plugin = L3ControllerPlugin::new(config, store, Arc::new(messenger));
    let ctx = RequestContext::admin();

    match host {
        Some(host) => {
            let scheduled = plugin.auto_schedule_routers(&ctx, host, router_ids)?;
            info!(%host, candidates = router_ids.len(), scheduled, "auto scheduling finished");
            println!("{host}: {}", if scheduled { "scheduled" } else { "no eligible L3 agent" });
        }
        None => {
            for router_id in router_ids {
                match plugin.schedule_router(&ctx, router_id)? {
                    Some(agent) => println!("{router_id}: {} ({})", agent.id, agent.host),
                    None => println!("{router_id}: not scheduled"),
                }
            }
        }
    }
    Ok(())
}
