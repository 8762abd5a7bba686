//! Error types for the l3ctl state store.

use thiserror::Error;

/// Result type alias for state store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur during state store operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open l3ctl state store: {0}")]
    Open(String),

    #[error("state store transaction failed: {0}")]
    Transaction(String),

    #[error("failed to open state table: {0}")]
    Table(String),

    #[error("failed to read from state table: {0}")]
    Read(String),

    #[error("failed to write to state table: {0}")]
    Write(String),

    #[error("failed to encode l3ctl record: {0}")]
    Serialize(String),

    #[error("corrupt {table} record {key:?}: {reason}")]
    Deserialize {
        table: String,
        key: String,
        reason: String,
    },
}
