//! Endpoint abstraction over one live transport.
//!
//! An [`Endpoint`] hides whether the peer speaks newline-delimited text
//! over a byte stream, discrete WebSocket frames, or the named-event
//! protocol. Each endpoint owns a spawned I/O task bridging the socket to
//! a channel pair: `send` queues one logical message outbound, `recv`
//! yields inbound messages in wire order, and `close` cancels the task
//! promptly via its [`CancellationToken`].
//!
//! # Lifecycle
//!
//! The inbound channel closing (`recv` returning `None`) is the closed
//! notification: it fires when the peer disconnects, the transport errors,
//! or `close` is called. Sends on a closed endpoint are logged no-ops -
//! they never surface an error into the session. Cancellation is
//! idempotent, so double-close is safe.

use std::fmt;

use crosswire_proto::LineFramer;
use futures_util::{SinkExt, StreamExt};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};
use tokio_tungstenite::{WebSocketStream, tungstenite::Message};
use tokio_util::sync::CancellationToken;

/// Messages buffered between a transport task and its session.
const CHANNEL_CAPACITY: usize = 32;

/// Which transport an endpoint wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Raw byte stream with line framing (the engine side).
    Line,
    /// WebSocket, one text frame per message.
    Frame,
    /// Named-event client over WebSocket.
    Event,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line => write!(f, "line"),
            Self::Frame => write!(f, "frame"),
            Self::Event => write!(f, "event"),
        }
    }
}

/// One live transport: send half, receive half, and a kill switch.
#[derive(Debug)]
pub struct Endpoint {
    kind: TransportKind,
    peer: String,
    outbound: mpsc::Sender<String>,
    inbound: mpsc::Receiver<String>,
    shutdown: CancellationToken,
}

impl Endpoint {
    /// Wrap a byte-stream transport with line framing.
    ///
    /// `seed` is whatever the protocol sniffer already consumed; it is fed
    /// through the framer first so no bytes are lost.
    pub fn line<S>(stream: S, peer: impl Into<String>, seed: Vec<u8>, max_line: usize) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (outbound_tx, outbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let shutdown = CancellationToken::new();

        tokio::spawn(run_line_io(
            stream,
            seed,
            max_line,
            inbound_tx,
            outbound_rx,
            shutdown.clone(),
        ));

        Self {
            kind: TransportKind::Line,
            peer: peer.into(),
            outbound: outbound_tx,
            inbound: inbound_rx,
            shutdown,
        }
    }

    /// Wrap an upgraded WebSocket connection.
    pub fn frame<S>(stream: WebSocketStream<S>, peer: impl Into<String>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        Self::websocket(TransportKind::Frame, stream, peer)
    }

    /// Wrap a dialed named-event remote connection.
    pub fn event<S>(stream: WebSocketStream<S>, peer: impl Into<String>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        Self::websocket(TransportKind::Event, stream, peer)
    }

    fn websocket<S>(kind: TransportKind, stream: WebSocketStream<S>, peer: impl Into<String>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (outbound_tx, outbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let shutdown = CancellationToken::new();

        tokio::spawn(run_ws_io(stream, inbound_tx, outbound_rx, shutdown.clone()));

        Self { kind, peer: peer.into(), outbound: outbound_tx, inbound: inbound_rx, shutdown }
    }

    /// Assemble an endpoint from raw channel halves.
    ///
    /// Used by in-process harnesses and tests to stand in for a transport
    /// without a socket: the caller keeps the far sides of both channels.
    #[must_use]
    pub fn from_parts(
        kind: TransportKind,
        peer: impl Into<String>,
        outbound: mpsc::Sender<String>,
        inbound: mpsc::Receiver<String>,
        shutdown: CancellationToken,
    ) -> Self {
        Self { kind, peer: peer.into(), outbound, inbound, shutdown }
    }

    /// Transport kind, for logs and pairing decisions.
    #[must_use]
    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    /// Peer address or URL, for logs.
    #[must_use]
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Queue one logical message for the peer.
    ///
    /// A send on a closed endpoint is a logged no-op, never an error into
    /// the caller.
    pub async fn send(&self, text: String) {
        if self.outbound.send(text).await.is_err() {
            tracing::debug!(kind = %self.kind, peer = %self.peer, "dropping send on closed endpoint");
        }
    }

    /// Next inbound message. `None` means the endpoint is closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.inbound.recv().await
    }

    /// Begin closing the transport. Idempotent; the I/O task exits
    /// promptly, cancelling any pending read or write.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    /// Resolves once the transport task has been told to stop.
    pub async fn closed(&self) {
        self.shutdown.cancelled().await;
    }

    /// Whether closing has begun.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

/// Bridge a line-framed byte stream to the channel pair.
async fn run_line_io<S>(
    stream: S,
    seed: Vec<u8>,
    max_line: usize,
    inbound: mpsc::Sender<String>,
    mut outbound: mpsc::Receiver<String>,
    shutdown: CancellationToken,
) where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let mut framer = LineFramer::new(max_line);
    let mut buf = vec![0u8; 4096];

    // Replay the sniffed prefix; it may already complete messages.
    let seeded = match framer.push(&seed) {
        Ok(messages) => messages,
        Err(e) => {
            tracing::warn!(error = %e, "closing line endpoint");
            shutdown.cancel();
            return;
        },
    };
    for message in seeded {
        if inbound.send(message).await.is_err() {
            shutdown.cancel();
            return;
        }
    }

    'io: loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                // Flush whatever was queued before the close was requested.
                while let Ok(text) = outbound.try_recv() {
                    if writer.write_all(LineFramer::encode(&text).as_bytes()).await.is_err() {
                        break;
                    }
                }
                break 'io;
            },

            read = reader.read(&mut buf) => match read {
                Ok(0) => break 'io,
                Ok(n) => match framer.push(&buf[..n]) {
                    Ok(messages) => {
                        for message in messages {
                            if inbound.send(message).await.is_err() {
                                break 'io;
                            }
                        }
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "closing line endpoint");
                        break 'io;
                    },
                },
                Err(e) => {
                    tracing::debug!(error = %e, "line read failed");
                    break 'io;
                },
            },

            message = outbound.recv() => match message {
                Some(text) => {
                    if let Err(e) = writer.write_all(LineFramer::encode(&text).as_bytes()).await {
                        tracing::debug!(error = %e, "line write failed");
                        break 'io;
                    }
                },
                None => break 'io,
            },
        }
    }

    let _ = writer.shutdown().await;
    shutdown.cancel();
}

/// Bridge a WebSocket connection to the channel pair.
async fn run_ws_io<S>(
    stream: WebSocketStream<S>,
    inbound: mpsc::Sender<String>,
    mut outbound: mpsc::Receiver<String>,
    shutdown: CancellationToken,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sink, mut source) = stream.split();

    'io: loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                // Flush whatever was queued before the close was requested.
                while let Ok(text) = outbound.try_recv() {
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                let _ = sink.send(Message::Close(None)).await;
                break 'io;
            },

            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if inbound.send(text.as_str().to_owned()).await.is_err() {
                        break 'io;
                    }
                },
                Some(Ok(Message::Binary(bytes))) => {
                    // Lenient like the original bridge: binary frames are
                    // decoded lossily and relayed as text.
                    let text = String::from_utf8_lossy(&bytes).into_owned();
                    if inbound.send(text).await.is_err() {
                        break 'io;
                    }
                },
                // Ping/pong are handled inside tungstenite.
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {},
                Some(Ok(Message::Close(_))) | None => break 'io,
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "websocket read failed");
                    break 'io;
                },
            },

            message = outbound.recv() => match message {
                Some(text) => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        tracing::debug!(error = %e, "websocket write failed");
                        break 'io;
                    }
                },
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break 'io;
                },
            },
        }
    }

    shutdown.cancel();
}

#[cfg(test)]
mod tests {
    use tokio_tungstenite::tungstenite::protocol::Role;

    use super::*;

    #[tokio::test]
    async fn line_endpoint_splits_and_frames() {
        let (mut far, near) = tokio::io::duplex(1024);
        let mut endpoint = Endpoint::line(near, "test", Vec::new(), 1024);

        far.write_all(b"one\ntwo\n").await.unwrap();
        assert_eq!(endpoint.recv().await.unwrap(), "one");
        assert_eq!(endpoint.recv().await.unwrap(), "two");

        endpoint.send("  reply  ".to_owned()).await;
        let mut buf = [0u8; 16];
        let n = far.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"reply\n");
    }

    #[tokio::test]
    async fn seed_bytes_are_not_lost() {
        let (_far, near) = tokio::io::duplex(1024);
        let mut endpoint = Endpoint::line(near, "test", b"ready\npar".to_vec(), 1024);

        assert_eq!(endpoint.recv().await.unwrap(), "ready");
    }

    #[tokio::test]
    async fn close_ends_the_stream() {
        let (mut far, near) = tokio::io::duplex(1024);
        let mut endpoint = Endpoint::line(near, "test", Vec::new(), 1024);

        endpoint.close();
        endpoint.close(); // idempotent

        assert_eq!(endpoint.recv().await, None);
        let n = far.read(&mut [0u8; 8]).await.unwrap();
        assert_eq!(n, 0, "far side should see EOF");
    }

    #[tokio::test]
    async fn oversized_line_closes_endpoint() {
        let (mut far, near) = tokio::io::duplex(1024);
        let mut endpoint = Endpoint::line(near, "test", Vec::new(), 8);

        far.write_all(b"this line is far too long").await.unwrap();
        assert_eq!(endpoint.recv().await, None);
    }

    #[tokio::test]
    async fn websocket_endpoint_relays_text_frames() {
        let (far, near) = tokio::io::duplex(1024);
        let server = WebSocketStream::from_raw_socket(near, Role::Server, None).await;
        let mut client = WebSocketStream::from_raw_socket(far, Role::Client, None).await;

        let mut endpoint = Endpoint::frame(server, "test");

        client.send(Message::Text("hello".into())).await.unwrap();
        assert_eq!(endpoint.recv().await.unwrap(), "hello");

        endpoint.send("world".to_owned()).await;
        let reply = client.next().await.unwrap().unwrap();
        assert_eq!(reply, Message::Text("world".into()));
    }

    #[tokio::test]
    async fn sends_after_close_are_no_ops() {
        let (_far, near) = tokio::io::duplex(1024);
        let mut endpoint = Endpoint::line(near, "test", Vec::new(), 1024);

        endpoint.close();
        assert_eq!(endpoint.recv().await, None);

        // Must not panic or error.
        endpoint.send("into the void".to_owned()).await;
        assert!(endpoint.is_closed());
    }
}
