//! Relay error types.

use crosswire_proto::ProtocolError;
use thiserror::Error;

/// Errors that can occur in the relay.
///
/// Only configuration errors are fatal for the process. Everything else is
/// scoped to one connection or one session: the affected endpoint is
/// closed, teardown propagates to its pair, and the accept loops keep
/// running.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration error (invalid bind address, missing remote URL, ...).
    ///
    /// Fatal: fix the configuration and restart.
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport/network error (accept failure, reset, write failure).
    #[error("transport error: {0}")]
    Transport(String),

    /// Protocol error from the translation layer.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Pairing failed: no counterpart endpoint could be produced.
    ///
    /// Surfaced to the front endpoint as an error envelope; the connection
    /// is kept open or closed per configuration, never silently hung.
    #[error("pairing failed: {0}")]
    Pairing(String),
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RelayError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
