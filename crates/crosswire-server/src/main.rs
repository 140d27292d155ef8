//! Crosswire relay binary.
//!
//! # Usage
//!
//! ```bash
//! # Shared port: engine TCP and WebSocket clients multiplex on one port
//! crosswire-server --bind 0.0.0.0:8080
//!
//! # Event bridge: WebSocket fronts, named-event remote per connection
//! crosswire-server --mode event-bridge --bind 0.0.0.0:8080 \
//!     --remote ws://signal.example:9000
//!
//! # Tunnel: raw TCP fronts, remote WebSocket per connection
//! crosswire-server --mode tunnel --bind 0.0.0.0:7777 \
//!     --remote ws://peer.example:8080
//! ```

use std::time::Duration;

use clap::{Parser, ValueEnum};
use crosswire_server::{DEFAULT_NO_ENGINE_MESSAGE, Relay, RelayConfig, Topology};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Pairing topology, as selected on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Engine TCP and WebSocket clients share one port.
    SharedPort,
    /// WebSocket fronts; each dials the named-event remote.
    EventBridge,
    /// Raw TCP fronts; each dials a remote WebSocket.
    Tunnel,
}

impl From<Mode> for Topology {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::SharedPort => Self::SharedPort,
            Mode::EventBridge => Self::EventBridge,
            Mode::Tunnel => Self::Tunnel,
        }
    }
}

/// Crosswire signaling relay
#[derive(Parser, Debug)]
#[command(name = "crosswire-server")]
#[command(about = "Dual-transport signaling relay")]
#[command(version)]
struct Args {
    /// Address to bind the front listener to
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    bind: String,

    /// Pairing topology
    #[arg(short, long, value_enum, default_value_t = Mode::SharedPort)]
    mode: Mode,

    /// Remote URL dialed per front connection (event-bridge and tunnel)
    #[arg(short, long)]
    remote: Option<String>,

    /// Seconds a new connection may stay silent before being dropped
    #[arg(long, default_value = "10")]
    sniff_window: u64,

    /// Maximum buffered line length in bytes
    #[arg(long, default_value = "65536")]
    max_line: usize,

    /// Error text sent to a frame client when no engine is registered
    #[arg(long, default_value = DEFAULT_NO_ENGINE_MESSAGE)]
    no_engine_message: String,

    /// Close front connections whose pairing failed instead of keeping
    /// them open
    #[arg(long)]
    close_unpaired: bool,

    /// Shared token the first message of every front connection must match
    #[arg(long)]
    token: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Crosswire relay starting");
    tracing::info!("Binding to {}", args.bind);

    let config = RelayConfig {
        bind: args.bind,
        topology: args.mode.into(),
        remote: args.remote,
        sniff_window: Duration::from_secs(args.sniff_window),
        max_line: args.max_line,
        no_engine_message: args.no_engine_message,
        close_unpaired: args.close_unpaired,
        token: args.token,
    };

    let relay = Relay::bind(config).await?;

    tracing::info!("Relay listening on {}", relay.local_addr()?);

    relay.run().await?;

    Ok(())
}
