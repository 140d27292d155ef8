//! Wire-format translation for the Crosswire relay.
//!
//! Crosswire bridges two transports that frame messages differently: a
//! byte-stream side (newline-delimited UTF-8 text over TCP) and a frame
//! side (one WebSocket text frame per logical message, optionally carrying
//! a named-event protocol). This crate is the pure translation layer
//! between them - no I/O, no async, fully deterministic.
//!
//! # Components
//!
//! - [`LineFramer`]: reassembles newline-delimited messages from arbitrary
//!   read chunks, and frames outgoing messages with exactly one terminator.
//! - [`Envelope`]: the generic `{"type": ..., "payload": ...}` message
//!   wrapper used on the frame side.
//! - [`EventMessage`] / [`EventWhitelist`]: the named-event wire format and
//!   the fixed set of event names eligible for forwarding.
//! - [`Translator`]: direction-aware composition of the above, selected per
//!   relay topology (passthrough vs. event bridge).

pub mod envelope;
pub mod errors;
pub mod event;
pub mod line;
pub mod translate;

pub use envelope::Envelope;
pub use errors::{ProtocolError, Result};
pub use event::{DEFAULT_EVENTS, EventMessage, EventWhitelist};
pub use line::LineFramer;
pub use translate::Translator;
