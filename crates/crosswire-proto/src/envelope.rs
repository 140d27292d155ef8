//! The generic `{type, payload}` message envelope.
//!
//! Frame-side clients speak in envelopes: a non-empty `type` string naming
//! the signaling message (offer, answer, ice-candidate, ...) and an opaque
//! `payload` the relay never interprets. The envelope is the frame-side
//! half of the named-event translation; see [`crate::translate`].
//!
//! # Invariants
//!
//! - `type` is present and non-empty after trimming.
//! - `payload` is present (`null` counts as present, a missing field does
//!   not).
//!
//! Envelopes violating either invariant are rejected by [`Envelope::parse`]
//! and must be dropped by the caller, never forwarded.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ProtocolError, Result};

/// Generic signaling message wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message kind, e.g. `offer` or `ice-candidate`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Opaque payload, forwarded without interpretation.
    pub payload: Value,
}

impl Envelope {
    /// Construct an envelope from its parts.
    #[must_use]
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self { kind: kind.into(), payload }
    }

    /// Parse and validate an envelope from frame text.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Envelope`] if the text is not a JSON object with a
    /// non-empty string `type` and a `payload` field.
    pub fn parse(text: &str) -> Result<Self> {
        let envelope: Self =
            serde_json::from_str(text).map_err(|e| ProtocolError::Envelope(e.to_string()))?;

        if envelope.kind.trim().is_empty() {
            return Err(ProtocolError::Envelope("empty type".to_owned()));
        }

        Ok(envelope)
    }

    /// Serialize for the frame side.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Envelope(e.to_string()))
    }
}

/// Build the structured error message sent to a front endpoint when
/// pairing fails, e.g. `{"error": "engine not connected yet"}`.
#[must_use]
pub fn error_envelope(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}
