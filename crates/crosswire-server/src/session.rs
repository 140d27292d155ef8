//! The core relay loop: one session per endpoint pair.
//!
//! A [`Session`] owns exactly one front and one back endpoint and pumps
//! messages between them through its [`Translator`] until either side
//! closes. Teardown is exactly-once and symmetric: whichever side ends
//! first, the other is closed best-effort and the session releases both.
//!
//! # Guarantees
//!
//! - Per-direction ordering: messages from one endpoint reach the other in
//!   the order received. Nothing is guaranteed across directions or across
//!   sessions.
//! - No forwarding after teardown begins; in-flight messages may drop.
//! - Malformed messages and non-whitelisted events are dropped (with a
//!   diagnostic for the former) without ending the session.
//! - Closing is prompt: endpoint cancellation aborts pending transport
//!   reads and writes, so teardown never waits on a quiet peer.

use crosswire_proto::Translator;

use crate::endpoint::Endpoint;

/// Direction of one forwarded message, for diagnostics.
#[derive(Debug, Clone, Copy)]
enum Direction {
    /// Front endpoint toward back endpoint.
    ToBack,
    /// Back endpoint toward front endpoint.
    ToFront,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Self::ToBack => "front->back",
            Self::ToFront => "back->front",
        }
    }
}

/// A paired front and back endpoint plus the forwarding logic between
/// them.
#[derive(Debug)]
pub struct Session {
    front: Endpoint,
    back: Endpoint,
    translator: Translator,
}

impl Session {
    /// Pair two endpoints. The session owns both from here on.
    #[must_use]
    pub fn pair(front: Endpoint, back: Endpoint, translator: Translator) -> Self {
        Self { front, back, translator }
    }

    /// Pump messages in both directions until either side closes, then
    /// tear both down.
    pub async fn run(self) {
        let Self { mut front, mut back, translator } = self;

        tracing::info!(
            front_kind = %front.kind(),
            front_peer = %front.peer(),
            back_kind = %back.kind(),
            back_peer = %back.peer(),
            "session started"
        );

        loop {
            tokio::select! {
                message = front.recv() => match message {
                    Some(text) => {
                        forward(&translator, Direction::ToBack, &text, &back).await;
                    },
                    None => break,
                },

                message = back.recv() => match message {
                    Some(text) => {
                        forward(&translator, Direction::ToFront, &text, &front).await;
                    },
                    None => break,
                },
            }
        }

        // Exactly-once, double-close-safe: cancellation is idempotent and
        // a side that is already gone ignores the second close.
        front.close();
        back.close();

        tracing::info!(front_peer = %front.peer(), back_peer = %back.peer(), "session ended");
    }
}

/// Translate one message and deliver it, applying the drop policy.
async fn forward(translator: &Translator, direction: Direction, text: &str, to: &Endpoint) {
    let translated = match direction {
        Direction::ToBack => translator.to_back(text),
        Direction::ToFront => translator.to_front(text),
    };

    match translated {
        Ok(Some(out)) => to.send(out).await,
        Ok(None) => {
            tracing::debug!(direction = direction.as_str(), "dropping non-whitelisted event");
        },
        Err(e) => {
            tracing::warn!(direction = direction.as_str(), error = %e, "dropping malformed message");
        },
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::endpoint::TransportKind;

    /// A memory endpoint plus the far sides of its channels.
    struct Harness {
        /// Feed messages "from the peer" into the endpoint.
        to_endpoint: mpsc::Sender<String>,
        /// Observe messages the session sent out of the endpoint.
        from_endpoint: mpsc::Receiver<String>,
        /// The endpoint's kill switch.
        shutdown: CancellationToken,
    }

    fn memory_endpoint(kind: TransportKind, name: &str) -> (Endpoint, Harness) {
        let (outbound_tx, outbound_rx) = mpsc::channel(8);
        let (inbound_tx, inbound_rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        let endpoint =
            Endpoint::from_parts(kind, name, outbound_tx, inbound_rx, shutdown.clone());
        let harness =
            Harness { to_endpoint: inbound_tx, from_endpoint: outbound_rx, shutdown };
        (endpoint, harness)
    }

    async fn recv_within(rx: &mut mpsc::Receiver<String>, ms: u64) -> Option<String> {
        tokio::time::timeout(Duration::from_millis(ms), rx.recv()).await.ok().flatten()
    }

    #[tokio::test]
    async fn forwards_both_directions_in_order() {
        let (front, mut front_h) = memory_endpoint(TransportKind::Frame, "front");
        let (back, mut back_h) = memory_endpoint(TransportKind::Line, "back");

        let session = Session::pair(front, back, Translator::Passthrough);
        let handle = tokio::spawn(session.run());

        front_h.to_endpoint.send("f1".to_owned()).await.unwrap();
        front_h.to_endpoint.send("f2".to_owned()).await.unwrap();
        back_h.to_endpoint.send("b1".to_owned()).await.unwrap();

        assert_eq!(recv_within(&mut back_h.from_endpoint, 500).await.unwrap(), "f1");
        assert_eq!(recv_within(&mut back_h.from_endpoint, 500).await.unwrap(), "f2");
        assert_eq!(recv_within(&mut front_h.from_endpoint, 500).await.unwrap(), "b1");

        handle.abort();
    }

    #[tokio::test]
    async fn front_close_tears_down_back() {
        let (front, front_h) = memory_endpoint(TransportKind::Frame, "front");
        let (back, back_h) = memory_endpoint(TransportKind::Line, "back");

        let handle = tokio::spawn(Session::pair(front, back, Translator::Passthrough).run());

        // Closing the front is signaled by its inbound channel ending.
        drop(front_h.to_endpoint);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("session must end within a bounded window")
            .expect("session task must not panic");

        assert!(back_h.shutdown.is_cancelled(), "back must be closed");
        assert!(front_h.shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn back_close_tears_down_front() {
        let (front, front_h) = memory_endpoint(TransportKind::Frame, "front");
        let (back, back_h) = memory_endpoint(TransportKind::Event, "back");

        let handle = tokio::spawn(Session::pair(front, back, Translator::Passthrough).run());

        drop(back_h.to_endpoint);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("session must end within a bounded window")
            .expect("session task must not panic");

        assert!(front_h.shutdown.is_cancelled(), "front must be closed");
        assert!(back_h.shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn malformed_envelope_does_not_end_session() {
        let (front, front_h) = memory_endpoint(TransportKind::Frame, "front");
        let (back, mut back_h) = memory_endpoint(TransportKind::Event, "back");

        let handle = tokio::spawn(Session::pair(front, back, Translator::event_bridge()).run());

        front_h.to_endpoint.send("not an envelope".to_owned()).await.unwrap();
        front_h
            .to_endpoint
            .send(r#"{"type":"offer","payload":{"sdp":"v=0"}}"#.to_owned())
            .await
            .unwrap();

        // The malformed message was dropped; the valid one still flows.
        let forwarded = recv_within(&mut back_h.from_endpoint, 500).await.unwrap();
        assert!(forwarded.contains(r#""event":"offer""#));

        handle.abort();
    }

    #[tokio::test]
    async fn non_whitelisted_event_not_forwarded_but_session_lives() {
        let (front, mut front_h) = memory_endpoint(TransportKind::Frame, "front");
        let (back, back_h) = memory_endpoint(TransportKind::Event, "back");

        let handle = tokio::spawn(Session::pair(front, back, Translator::event_bridge()).run());

        back_h.to_endpoint.send(r#"{"event":"shutdown","data":1}"#.to_owned()).await.unwrap();
        back_h
            .to_endpoint
            .send(r#"{"event":"answer","data":{"sdp":"v=0"}}"#.to_owned())
            .await
            .unwrap();

        // Only the whitelisted event arrives, proving the first was dropped
        // and per-direction order is preserved.
        let forwarded = recv_within(&mut front_h.from_endpoint, 500).await.unwrap();
        assert!(forwarded.contains(r#""type":"answer""#));
        assert!(recv_within(&mut front_h.from_endpoint, 100).await.is_none());

        handle.abort();
    }
}
