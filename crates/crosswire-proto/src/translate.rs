//! Direction-aware message translation between paired endpoints.
//!
//! Every session owns one [`Translator`] chosen by topology:
//!
//! - [`Translator::Passthrough`] for raw tunnels (byte-stream ⇄ frame):
//!   messages cross unchanged; only the framing differs, and that is the
//!   transport layer's business.
//! - [`Translator::event_bridge`] for the envelope ⇄ named-event topology:
//!   front envelopes become named events toward the remote, and remote
//!   events become envelopes toward the front - but only for whitelisted
//!   event names.
//!
//! # Outcomes
//!
//! Translation is per-message and three-valued: `Ok(Some(text))` means
//! forward, `Ok(None)` means silently drop (non-whitelisted event), and
//! `Err` means the message was malformed and must be dropped with a
//! diagnostic. None of these outcomes ends the session.

use crate::{
    envelope::Envelope,
    errors::Result,
    event::{EventMessage, EventWhitelist},
};

/// Per-session message translation policy.
#[derive(Debug, Clone)]
pub enum Translator {
    /// Forward messages unchanged in both directions.
    Passthrough,

    /// Translate envelopes to named events and back, filtering
    /// remote-to-front traffic through the whitelist.
    EventBridge {
        /// Event names eligible for remote-to-front forwarding.
        whitelist: EventWhitelist,
    },
}

impl Translator {
    /// Event-bridge translator with the default signaling whitelist.
    #[must_use]
    pub fn event_bridge() -> Self {
        Self::EventBridge { whitelist: EventWhitelist::default() }
    }

    /// Translate a front-originated message for the back endpoint.
    ///
    /// # Errors
    ///
    /// In event-bridge mode, a message that is not a valid envelope is
    /// rejected; the caller logs and drops it.
    pub fn to_back(&self, text: &str) -> Result<Option<String>> {
        match self {
            Self::Passthrough => Ok(Some(text.to_owned())),
            Self::EventBridge { .. } => {
                let envelope = Envelope::parse(text)?;
                let event = EventMessage::new(envelope.kind, envelope.payload);
                Ok(Some(event.to_json()?))
            },
        }
    }

    /// Translate a back-originated message for the front endpoint.
    ///
    /// Returns `Ok(None)` for events outside the whitelist - those are
    /// dropped without a diagnostic, per contract.
    ///
    /// # Errors
    ///
    /// In event-bridge mode, a message that is not a valid event object is
    /// rejected; the caller logs and drops it.
    pub fn to_front(&self, text: &str) -> Result<Option<String>> {
        match self {
            Self::Passthrough => Ok(Some(text.to_owned())),
            Self::EventBridge { whitelist } => {
                let event = EventMessage::parse(text)?;
                if !whitelist.allows(&event.event) {
                    return Ok(None);
                }
                let envelope = Envelope::new(event.event, event.data);
                Ok(Some(envelope.to_json()?))
            },
        }
    }
}
