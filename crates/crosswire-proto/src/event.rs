//! Named-event wire messages and the forwarding whitelist.
//!
//! The named-event remote dispatches messages by a string event name rather
//! than a single generic message type. On the wire (one WebSocket text
//! frame per message) that is a JSON object `{"event": ..., "data": ...}`.
//!
//! Traffic flowing from the remote toward a front endpoint is restricted to
//! a fixed set of event names; anything outside the set is silently
//! dropped. The set covers the signaling vocabulary and nothing else, so a
//! misbehaving remote cannot inject arbitrary messages into a front client.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ProtocolError, Result};

/// Event names forwarded from the remote toward the front by default.
pub const DEFAULT_EVENTS: &[&str] =
    &["offer", "answer", "ice-candidate", "peer-joined", "peer-left", "joined"];

/// One named-event message as carried on the remote connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMessage {
    /// Event name the remote dispatches on.
    pub event: String,

    /// Structured event payload.
    pub data: Value,
}

impl EventMessage {
    /// Construct an event message from its parts.
    #[must_use]
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self { event: event.into(), data }
    }

    /// Parse an event message from remote frame text.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Event`] if the text is not a JSON object with a
    /// string `event` and a `data` field.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Event(e.to_string()))
    }

    /// Serialize for the remote connection.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Event(e.to_string()))
    }
}

/// Fixed set of event names eligible for remote-to-front forwarding.
#[derive(Debug, Clone)]
pub struct EventWhitelist {
    names: HashSet<String>,
}

impl Default for EventWhitelist {
    /// The signaling vocabulary: [`DEFAULT_EVENTS`].
    fn default() -> Self {
        Self::new(DEFAULT_EVENTS.iter().map(|&name| name.to_owned()))
    }
}

impl EventWhitelist {
    /// Build a whitelist from explicit event names.
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        Self { names: names.into_iter().collect() }
    }

    /// Whether an event name may be forwarded toward the front.
    #[must_use]
    pub fn allows(&self, event: &str) -> bool {
        self.names.contains(event)
    }
}
