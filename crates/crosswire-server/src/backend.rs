//! Pluggable pairing policy: where the back endpoint comes from.
//!
//! Every topology runs the same accept/classify/pair/session pipeline; the
//! one piece that differs is how the counterpart endpoint is produced when
//! a front connection arrives. [`Backend::acquire`] is that policy:
//!
//! - [`Backend::Slot`]: pair against the singleton engine slot's occupant
//!   at connect time (shared-port topology). Fails fast when empty.
//! - [`Backend::DialFrame`]: dial a remote WebSocket fresh per connection
//!   (tunnel topology).
//! - [`Backend::DialEvent`]: dial the named-event remote fresh per
//!   connection (event-bridge topology).
//!
//! The dialing variants are strict 1:1 - each front connection gets a
//! dedicated back connection and sessions share no state, so one failed
//! dial never perturbs another session. There is no dial retry; a failed
//! dial surfaces as a pairing error on that connection alone.

use std::sync::Arc;

use crosswire_proto::Translator;
use tokio_tungstenite::connect_async;

use crate::{endpoint::Endpoint, error::RelayError, slot::EngineSlot};

/// Producer of back endpoints for one relay topology.
#[derive(Debug)]
pub enum Backend {
    /// Take the current occupant of the engine slot.
    Slot {
        /// The singleton registration slot.
        slot: Arc<EngineSlot>,
        /// Error text surfaced to the front when the slot is empty.
        empty_message: String,
    },

    /// Dial a remote WebSocket per front connection.
    DialFrame {
        /// Remote URL, e.g. `ws://peer.example:9000`.
        url: String,
    },

    /// Dial the named-event remote per front connection.
    DialEvent {
        /// Remote URL, e.g. `ws://signal.example:9000`.
        url: String,
    },
}

impl Backend {
    /// Produce the back endpoint for a newly arrived front connection.
    ///
    /// # Errors
    ///
    /// [`RelayError::Pairing`] when the slot is empty;
    /// [`RelayError::Transport`] when an outbound dial fails. Either way
    /// the caller surfaces an error envelope to the front endpoint.
    pub async fn acquire(&self) -> Result<Endpoint, RelayError> {
        match self {
            Self::Slot { slot, empty_message } => {
                // An engine that went away while waiting unpaired leaves a
                // dead endpoint behind; never hand that to a client.
                while let Some(endpoint) = slot.take().await {
                    if !endpoint.is_closed() {
                        return Ok(endpoint);
                    }
                    tracing::debug!(peer = %endpoint.peer(), "discarding dead engine endpoint");
                }
                Err(RelayError::Pairing(empty_message.clone()))
            },

            Self::DialFrame { url } => {
                let (stream, _response) = connect_async(url.as_str())
                    .await
                    .map_err(|e| RelayError::Transport(format!("dial {url} failed: {e}")))?;
                tracing::debug!(%url, "dialed remote websocket");
                Ok(Endpoint::frame(stream, url.clone()))
            },

            Self::DialEvent { url } => {
                let (stream, _response) = connect_async(url.as_str())
                    .await
                    .map_err(|e| RelayError::Transport(format!("dial {url} failed: {e}")))?;
                tracing::debug!(%url, "dialed named-event remote");
                Ok(Endpoint::event(stream, url.clone()))
            },
        }
    }

    /// The message translation this pairing implies.
    ///
    /// Only the named-event remote needs envelope translation; the other
    /// backends relay text unchanged.
    #[must_use]
    pub fn translator(&self) -> Translator {
        match self {
            Self::Slot { .. } | Self::DialFrame { .. } => Translator::Passthrough,
            Self::DialEvent { .. } => Translator::event_bridge(),
        }
    }
}
