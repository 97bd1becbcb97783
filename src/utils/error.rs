//! The `error` module defines the error type used across `lanchat`.
//!
//! Per-client I/O failures never surface here: the pumps handle them locally
//! by closing and unregistering the client. `RelayError` covers startup
//! failures and the few operations a caller can act on.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize envelope: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("invalid listen address '{0}'")]
    InvalidAddr(String),

    #[error("invalid upload filename '{0}'")]
    InvalidFilename(String),

    #[error("write did not complete within the write deadline")]
    WriteTimeout,

    /// The hub loop has stopped and no longer accepts events.
    #[error("hub is closed")]
    HubClosed,
}
