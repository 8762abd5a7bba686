//! Run mode — feeds a JSON-lines event file through the plugin.
//!
//! In this mode, the daemon:
//! 1. Opens the state store and builds the L3 controller plugin
//! 2. Subscribes the event dispatcher to the in-process bus
//! 3. Publishes every event from the file onto the bus
//! 4. Prints each agent message the plugin emits as one JSON line
//!
//! It stops at end of file or on Ctrl-C, after in-flight events finish.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use l3ctl_core::ControllerConfig;
use l3ctl_notify::{AgentMessage, ChannelMessenger};
use l3ctl_plugin::{BusEvent, EventBus, EventDispatcher, L3ControllerPlugin};

pub async fn run(config: &ControllerConfig, events_path: &Path) -> anyhow::Result<()> {
    info!("l3ctl daemon starting");

    // ── Plugin ───────────────────────────────────────────────────
    let store = crate::open_store(config)?;
    let (messenger, messages) = ChannelMessenger::new();
    let plugin = Arc::new(L3ControllerPlugin::new(config, store, Arc::new(messenger)));
    info!(
        plugin_type = plugin.plugin_type(),
        description = plugin.plugin_description(),
        "plugin loaded"
    );

    // ── Bus + dispatcher ─────────────────────────────────────────
    let bus = EventBus::new();
    let dispatcher = Arc::new(EventDispatcher::new(plugin));
    let events = dispatcher.subscribe(&bus).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatcher_handle = tokio::spawn(dispatcher.run(events, shutdown_rx));
    let printer_handle = tokio::spawn(print_messages(messages));

    // ── Feed ─────────────────────────────────────────────────────
    tokio::select! {
        fed = publish_file(&bus, events_path) => {
            let published = fed?;
            info!(published, "event file exhausted");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    }

    // Closing the bus ends the dispatcher loop once queued events drain.
    drop(bus);
    let handled = dispatcher_handle.await?;
    let printed = printer_handle.await?;

    info!(handled, printed, "l3ctl daemon stopped");
    Ok(())
}

/// Publish each line of the file as a bus event. Malformed lines are
/// logged and skipped.
async fn publish_file(bus: &EventBus, path: &Path) -> anyhow::Result<usize> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open event file {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();

    let mut published = 0;
    let mut line_no = 0;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        let event: BusEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = line_no, error = %e, "skipping malformed event");
                continue;
            }
        };
        let delivered = bus.publish(event).await;
        debug!(line = line_no, delivered, "event published");
        published += 1;
    }
    Ok(published)
}

/// Print agent messages as JSON lines until every sender is gone.
async fn print_messages(mut messages: UnboundedReceiver<AgentMessage>) -> usize {
    let mut printed = 0;
    while let Some(message) = messages.recv().await {
        match serde_json::to_string(&message) {
            Ok(line) => {
                println!("{line}");
                printed += 1;
            }
            Err(e) => warn!(error = %e, "failed to encode agent message"),
        }
    }
    printed
}
