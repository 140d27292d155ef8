//! Protocol error types.

use thiserror::Error;

/// Errors produced by the translation layer.
///
/// These are per-message errors: the caller drops the offending message
/// (with a diagnostic) or closes the offending endpoint, but the relay as a
/// whole keeps running. See the server crate for the recovery policy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// A line exceeded the configured bound without a terminator.
    ///
    /// Fatal for the offending endpoint: the framer cannot resynchronize
    /// once its buffer limit is blown, so the connection must be closed.
    #[error("line exceeds {max} bytes without a terminator")]
    LineTooLong {
        /// Configured maximum line length in bytes.
        max: usize,
    },

    /// A frame-side message was not a valid `{type, payload}` envelope.
    ///
    /// Recoverable: the message is dropped, the session stays alive.
    #[error("invalid message envelope: {0}")]
    Envelope(String),

    /// A named-event message was not a valid `{event, data}` object.
    ///
    /// Recoverable: the message is dropped, the session stays alive.
    #[error("invalid event message: {0}")]
    Event(String),
}

/// Convenience alias for translation results.
pub type Result<T> = std::result::Result<T, ProtocolError>;
