//! Relay runtime configuration.
//!
//! Three topologies share the same components; only the pairing policy and
//! the front transport differ. Tunables the wire protocol does not pin
//! down (sniff window, line bound) default to explicit bounds rather than
//! unbounded buffering.

use std::time::Duration;

use crosswire_proto::line::DEFAULT_MAX_LINE;

/// Default error text sent to a frame client when no engine is registered.
pub const DEFAULT_NO_ENGINE_MESSAGE: &str = "engine not connected yet";

/// Default window in which a sniffed connection must send its first bytes.
pub const DEFAULT_SNIFF_WINDOW: Duration = Duration::from_secs(10);

/// Which endpoints the relay pairs, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// One shared port. Raw byte-stream connections occupy the singleton
    /// engine slot; WebSocket upgrades pair against the slot occupant.
    SharedPort,

    /// WebSocket listener in front; each accepted connection dials the
    /// named-event remote fresh. Strict 1:1, unlimited concurrent sessions.
    EventBridge,

    /// Raw byte-stream listener in front; each accepted connection dials a
    /// remote WebSocket fresh. Strict 1:1.
    Tunnel,
}

/// Runtime configuration for the relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address to bind the front listener to, e.g. `0.0.0.0:8080`.
    pub bind: String,

    /// Pairing topology.
    pub topology: Topology,

    /// Remote URL dialed for each front connection, e.g.
    /// `ws://signal.example:9000`. Required for [`Topology::EventBridge`]
    /// and [`Topology::Tunnel`], ignored for [`Topology::SharedPort`].
    pub remote: Option<String>,

    /// How long a sniffed connection may stay silent before it is closed.
    pub sniff_window: Duration,

    /// Bound on a single buffered byte-stream line.
    pub max_line: usize,

    /// Error text sent to a frame client when the engine slot is empty.
    pub no_engine_message: String,

    /// Close a front connection whose pairing failed instead of keeping it
    /// open unpaired.
    pub close_unpaired: bool,

    /// Shared token the first front message must match, when set.
    pub token: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_owned(),
            topology: Topology::SharedPort,
            remote: None,
            sniff_window: DEFAULT_SNIFF_WINDOW,
            max_line: DEFAULT_MAX_LINE,
            no_engine_message: DEFAULT_NO_ENGINE_MESSAGE.to_owned(),
            close_unpaired: false,
            token: None,
        }
    }
}

impl RelayConfig {
    /// Validate topology/remote consistency.
    ///
    /// # Errors
    ///
    /// [`crate::RelayError::Config`] if a dialing topology has no remote
    /// URL.
    pub fn validate(&self) -> Result<(), crate::RelayError> {
        match self.topology {
            Topology::SharedPort => Ok(()),
            Topology::EventBridge | Topology::Tunnel => {
                if self.remote.is_none() {
                    return Err(crate::RelayError::Config(format!(
                        "{:?} topology requires a remote URL",
                        self.topology
                    )));
                }
                Ok(())
            },
        }
    }
}
