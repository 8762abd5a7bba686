//! Notifier error types.

use thiserror::Error;

pub type NotifyResult<T> = Result<T, NotifyError>;

/// Errors raised while handing a message to the messaging layer.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("message channel closed")]
    ChannelClosed,

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("agent registry error: {0}")]
    Registry(#[from] l3ctl_state::StateError),
}
