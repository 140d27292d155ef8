//! Crosswire relay server.
//!
//! Crosswire bridges a byte-stream client (a game-engine process speaking
//! newline-delimited messages over TCP) to a frame-based signaling peer (a
//! WebSocket endpoint, optionally forwarding to a named-event pub/sub
//! remote). Neither side knows the other's transport; the relay forwards
//! opaque signaling payloads best-effort while both ends are open.
//!
//! # Architecture
//!
//! - [`sniff`]: classifies shared-port connections (WebSocket handshake
//!   vs. raw byte stream) without losing bytes.
//! - [`Endpoint`]: one live transport behind a channel pair and a spawned
//!   I/O task.
//! - [`EngineSlot`]: singleton registration slot for the engine endpoint
//!   (shared-port topology), last-writer-wins with close-on-replace.
//! - [`Backend`]: the pluggable pairing policy - slot occupant or a fresh
//!   outbound dial per connection.
//! - [`Session`]: owns one front/back pair and pumps messages through a
//!   [`crosswire_proto::Translator`] until either side closes.
//! - [`Relay`]: binds the listener and wires the above per topology.
//!
//! One task per connection, one per session; no shared mutable state
//! between sessions except the engine slot. An error in one session never
//! affects another or the accept loop.

pub mod backend;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod session;
pub mod slot;
pub mod sniff;

use std::{net::SocketAddr, sync::Arc};

pub use backend::Backend;
pub use config::{DEFAULT_NO_ENGINE_MESSAGE, RelayConfig, Topology};
use crosswire_proto::envelope::error_envelope;
pub use endpoint::{Endpoint, TransportKind};
pub use error::RelayError;
pub use session::Session;
pub use slot::EngineSlot;
use sniff::{Rewind, Sniffed};
use tokio::net::{TcpListener, TcpStream};

/// The relay runtime: a bound front listener plus its topology wiring.
pub struct Relay {
    config: RelayConfig,
    listener: TcpListener,
}

impl Relay {
    /// Validate the configuration and bind the front listener.
    pub async fn bind(config: RelayConfig) -> Result<Self, RelayError> {
        config.validate()?;

        let listener = TcpListener::bind(&config.bind)
            .await
            .map_err(|e| RelayError::Config(format!("failed to bind {}: {e}", config.bind)))?;

        Ok(Self { config, listener })
    }

    /// Local address the front listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, RelayError> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the relay, accepting connections until the process stops.
    pub async fn run(self) -> Result<(), RelayError> {
        let config = Arc::new(self.config);
        tracing::info!(topology = ?config.topology, "relay starting");

        match config.topology {
            Topology::SharedPort => run_shared_port(self.listener, config).await,
            Topology::EventBridge => {
                let backend = dialing_backend(&config, true)?;
                run_frame_front(self.listener, config, backend).await
            },
            Topology::Tunnel => {
                let backend = dialing_backend(&config, false)?;
                run_line_front(self.listener, config, backend).await
            },
        }
    }
}

/// Build the per-connection dialing backend for topologies 2 and 3.
fn dialing_backend(config: &RelayConfig, named_event: bool) -> Result<Arc<Backend>, RelayError> {
    let url = config
        .remote
        .clone()
        .ok_or_else(|| RelayError::Config("dialing topology requires a remote URL".to_owned()))?;

    Ok(Arc::new(if named_event {
        Backend::DialEvent { url }
    } else {
        Backend::DialFrame { url }
    }))
}

/// Topology 1: raw engine connections and WebSocket upgrades share one
/// port; the sniffer tells them apart.
async fn run_shared_port(listener: TcpListener, config: Arc<RelayConfig>) -> Result<(), RelayError> {
    let slot = Arc::new(EngineSlot::new());
    let backend = Arc::new(Backend::Slot {
        slot: Arc::clone(&slot),
        empty_message: config.no_engine_message.clone(),
    });

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let slot = Arc::clone(&slot);
                let backend = Arc::clone(&backend);
                let config = Arc::clone(&config);

                tokio::spawn(async move {
                    if let Err(e) = handle_shared(stream, addr, slot, backend, config).await {
                        tracing::debug!(peer = %addr, error = %e, "connection dropped");
                    }
                });
            },
            Err(e) => tracing::error!(error = %e, "accept failed"),
        }
    }
}

/// Classify one shared-port connection and route it.
async fn handle_shared(
    mut stream: TcpStream,
    addr: SocketAddr,
    slot: Arc<EngineSlot>,
    backend: Arc<Backend>,
    config: Arc<RelayConfig>,
) -> Result<(), RelayError> {
    match sniff::sniff(&mut stream, config.sniff_window).await? {
        Sniffed::Line { prefix } => {
            tracing::info!(peer = %addr, "engine connected");
            let endpoint = Endpoint::line(stream, addr.to_string(), prefix, config.max_line);
            slot.register(endpoint).await;
            Ok(())
        },

        Sniffed::WebSocket { prefix } => {
            // The sniff window bounds the whole handshake, not just the
            // first read; a stalled upgrade must not hold the socket open.
            let ws = tokio::time::timeout(
                config.sniff_window,
                tokio_tungstenite::accept_async(Rewind::new(prefix, stream)),
            )
            .await
            .map_err(|_| RelayError::Transport("websocket upgrade stalled".to_owned()))?
            .map_err(|e| RelayError::Transport(format!("websocket upgrade failed: {e}")))?;
            tracing::info!(peer = %addr, "frame client connected");

            let mut front = Endpoint::frame(ws, addr.to_string());
            if !authenticate(&mut front, &config).await {
                front.close();
                return Ok(());
            }

            pair_and_run(front, &backend, &config).await;
            Ok(())
        },
    }
}

/// Topology 2 front: accept WebSocket clients, dial the remote per
/// connection.
async fn run_frame_front(
    listener: TcpListener,
    config: Arc<RelayConfig>,
    backend: Arc<Backend>,
) -> Result<(), RelayError> {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let backend = Arc::clone(&backend);
                let config = Arc::clone(&config);

                tokio::spawn(async move {
                    let upgrade = tokio::time::timeout(
                        config.sniff_window,
                        tokio_tungstenite::accept_async(stream),
                    )
                    .await;
                    let ws = match upgrade {
                        Ok(Ok(ws)) => ws,
                        Ok(Err(e)) => {
                            tracing::debug!(peer = %addr, error = %e, "websocket upgrade failed");
                            return;
                        },
                        Err(_) => {
                            tracing::debug!(peer = %addr, "websocket upgrade stalled");
                            return;
                        },
                    };
                    tracing::info!(peer = %addr, "frame client connected");

                    let mut front = Endpoint::frame(ws, addr.to_string());
                    if !authenticate(&mut front, &config).await {
                        front.close();
                        return;
                    }

                    pair_and_run(front, &backend, &config).await;
                });
            },
            Err(e) => tracing::error!(error = %e, "accept failed"),
        }
    }
}

/// Topology 3 front: accept raw byte-stream clients, dial the remote per
/// connection.
async fn run_line_front(
    listener: TcpListener,
    config: Arc<RelayConfig>,
    backend: Arc<Backend>,
) -> Result<(), RelayError> {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let backend = Arc::clone(&backend);
                let config = Arc::clone(&config);

                tokio::spawn(async move {
                    tracing::info!(peer = %addr, "line client connected");
                    let mut front =
                        Endpoint::line(stream, addr.to_string(), Vec::new(), config.max_line);
                    if !authenticate(&mut front, &config).await {
                        front.close();
                        return;
                    }

                    pair_and_run(front, &backend, &config).await;
                });
            },
            Err(e) => tracing::error!(error = %e, "accept failed"),
        }
    }
}

/// Acquire the back endpoint and run the session to completion, or surface
/// a pairing failure to the front.
async fn pair_and_run(front: Endpoint, backend: &Backend, config: &RelayConfig) {
    match backend.acquire().await {
        Ok(back) => Session::pair(front, back, backend.translator()).run().await,

        Err(e) => {
            tracing::warn!(peer = %front.peer(), error = %e, "pairing failed");

            let message = match e {
                RelayError::Pairing(message) => message,
                other => other.to_string(),
            };
            front.send(error_envelope(&message)).await;

            if config.close_unpaired {
                front.close();
            } else {
                drain_unpaired(front).await;
            }
        },
    }
}

/// Hold an unpaired front connection open, discarding whatever it sends,
/// until the client goes away. Keeping it open (rather than hanging up)
/// lets the client see the error envelope and decide for itself.
async fn drain_unpaired(mut front: Endpoint) {
    while let Some(message) = front.recv().await {
        tracing::debug!(peer = %front.peer(), len = message.len(), "discarding message from unpaired client");
    }
}

/// Enforce the optional shared-token check on a front endpoint.
///
/// When a token is configured, the first message must match it exactly;
/// the matching message is consumed, not forwarded. Without a token this
/// is a no-op.
async fn authenticate(front: &mut Endpoint, config: &RelayConfig) -> bool {
    let Some(expected) = &config.token else {
        return true;
    };

    match tokio::time::timeout(config.sniff_window, front.recv()).await {
        Ok(Some(first)) if first == *expected => true,
        _ => {
            tracing::warn!(peer = %front.peer(), "front connection failed token check");
            false
        },
    }
}
