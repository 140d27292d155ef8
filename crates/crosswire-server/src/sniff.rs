//! Protocol classification for the shared listening port.
//!
//! The shared-port topology accepts both raw engine byte streams and
//! WebSocket upgrades on one socket. Classification reads the first chunk:
//! an HTTP request line (WebSocket handshakes always start with `GET`)
//! means a frame-protocol handshake, anything else is a raw byte-stream
//! client. Nothing is discarded - the consumed chunk is either replayed
//! into the upgrade handshake via [`Rewind`] or seeded into the line
//! framer.
//!
//! A connection that stays silent past the sniff window is closed rather
//! than held; idle unclassified sockets are the cheapest resource leak to
//! avoid.

use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, ReadBuf},
    net::TcpStream,
    time::timeout,
};

use crate::error::RelayError;

/// Classification of a freshly accepted connection.
#[derive(Debug)]
pub enum Sniffed {
    /// The first chunk begins an HTTP request line: hand `prefix` plus the
    /// stream to the WebSocket upgrade.
    WebSocket {
        /// Bytes consumed during classification.
        prefix: Vec<u8>,
    },
    /// Raw byte-stream client; `prefix` seeds the line framer.
    Line {
        /// Bytes consumed during classification.
        prefix: Vec<u8>,
    },
}

/// Read and classify the first chunk of a connection.
///
/// Classification is based on the first bytes of the first read, mirroring
/// the single-chunk detection of typical shared-port bridges: a client
/// that splits `GET` itself across writes is treated as a byte stream.
///
/// # Errors
///
/// [`RelayError::Transport`] if the connection closes, errors, or stays
/// silent past `window`.
pub async fn sniff(stream: &mut TcpStream, window: Duration) -> Result<Sniffed, RelayError> {
    let mut buf = vec![0u8; 1024];

    let n = timeout(window, stream.read(&mut buf))
        .await
        .map_err(|_| RelayError::Transport("no bytes within sniff window".to_owned()))??;

    if n == 0 {
        return Err(RelayError::Transport("connection closed before first byte".to_owned()));
    }

    buf.truncate(n);
    if buf.starts_with(b"GET") {
        Ok(Sniffed::WebSocket { prefix: buf })
    } else {
        Ok(Sniffed::Line { prefix: buf })
    }
}

/// Stream adapter that replays already-consumed bytes before the inner
/// stream, so a sniffed WebSocket handshake loses nothing.
#[derive(Debug)]
pub struct Rewind<S> {
    prefix: Vec<u8>,
    offset: usize,
    inner: S,
}

impl<S> Rewind<S> {
    /// Wrap `inner`, serving `prefix` to readers first.
    #[must_use]
    pub fn new(prefix: Vec<u8>, inner: S) -> Self {
        Self { prefix, offset: 0, inner }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for Rewind<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.offset < self.prefix.len() {
            let remaining = &self.prefix[self.offset..];
            let take = remaining.len().min(buf.remaining());
            buf.put_slice(&remaining[..take]);
            self.offset += take;
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Rewind<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, data)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::AsyncWriteExt,
        net::{TcpListener, TcpStream},
    };

    use super::*;

    async fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (client, server)
    }

    #[tokio::test]
    async fn http_request_line_classifies_as_websocket() {
        let (mut client, mut server) = connected_pair().await;
        client.write_all(b"GET /ws HTTP/1.1\r\nHost: x\r\n\r\n").await.unwrap();

        match sniff(&mut server, Duration::from_secs(1)).await.unwrap() {
            Sniffed::WebSocket { prefix } => {
                assert!(prefix.starts_with(b"GET /ws"));
            },
            Sniffed::Line { .. } => unreachable!("handshake misclassified as byte stream"),
        }
    }

    #[tokio::test]
    async fn raw_bytes_classify_as_line() {
        let (mut client, mut server) = connected_pair().await;
        client.write_all(b"hello\n").await.unwrap();

        match sniff(&mut server, Duration::from_secs(1)).await.unwrap() {
            Sniffed::Line { prefix } => assert_eq!(prefix, b"hello\n"),
            Sniffed::WebSocket { .. } => unreachable!("byte stream misclassified as handshake"),
        }
    }

    #[tokio::test]
    async fn silent_connection_times_out() {
        let (_client, mut server) = connected_pair().await;
        let result = sniff(&mut server, Duration::from_millis(50)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn closed_connection_is_an_error() {
        let (client, mut server) = connected_pair().await;
        drop(client);
        let result = sniff(&mut server, Duration::from_secs(1)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn rewind_replays_prefix_before_inner() {
        let (near, mut far) = tokio::io::duplex(64);
        far.write_all(b" world").await.unwrap();

        let mut rewound = Rewind::new(b"hello".to_vec(), near);
        let mut buf = vec![0u8; 11];
        rewound.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello world");
    }
}
