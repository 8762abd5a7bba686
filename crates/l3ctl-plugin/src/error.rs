//! Plugin error types.

use thiserror::Error;

/// Errors that abort the handling of a single event or request.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("port not found: {0}")]
    PortNotFound(String),

    #[error("subnet not found: {0}")]
    SubnetNotFound(String),

    #[error("state store error: {0}")]
    State(#[from] l3ctl_state::StateError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] l3ctl_scheduler::SchedulerError),
}

pub type PluginResult<T> = Result<T, PluginError>;
