//! Singleton registration slot for the engine endpoint.
//!
//! The shared-port topology expects exactly one engine process at a time.
//! The slot holds the engine's endpoint between its connection and the
//! moment a frame client pairs with it. Registration is last-writer-wins:
//! a reconnecting engine unconditionally replaces the occupant, and the
//! replaced endpoint is explicitly closed so half-dead engine sockets
//! cannot accumulate.
//!
//! Pairing takes the occupant out of the slot, moving ownership into the
//! session. That is what keeps delivery single-subscriber: an engine's
//! message stream never has more than one consumer, so a later frame
//! client can never siphon messages from an earlier client's session.
//!
//! Swap and take are atomic with respect to each other; a pairing attempt
//! racing a replacement observes either the old occupant or the new one,
//! never a stale reference to both.

use tokio::sync::Mutex;

use crate::endpoint::Endpoint;

/// Single-occupant holder for the engine endpoint.
#[derive(Debug, Default)]
pub struct EngineSlot {
    occupant: Mutex<Option<Endpoint>>,
}

impl EngineSlot {
    /// Create an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an engine endpoint, replacing and closing any previous
    /// occupant (last-writer-wins).
    pub async fn register(&self, endpoint: Endpoint) {
        let replaced = {
            let mut occupant = self.occupant.lock().await;
            occupant.replace(endpoint)
        };

        if let Some(old) = replaced {
            tracing::info!(peer = %old.peer(), "replacing registered engine endpoint");
            old.close();
        }
    }

    /// Take the current occupant for pairing, leaving the slot empty.
    pub async fn take(&self) -> Option<Endpoint> {
        self.occupant.lock().await.take()
    }

    /// Whether an engine is currently registered.
    pub async fn is_occupied(&self) -> bool {
        self.occupant.lock().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::endpoint::TransportKind;

    fn memory_endpoint(name: &str) -> (Endpoint, CancellationToken) {
        let (outbound_tx, _outbound_rx) = mpsc::channel(8);
        let (_inbound_tx, inbound_rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        let endpoint = Endpoint::from_parts(
            TransportKind::Line,
            name,
            outbound_tx,
            inbound_rx,
            shutdown.clone(),
        );
        (endpoint, shutdown)
    }

    #[tokio::test]
    async fn empty_slot_pairs_nothing() {
        let slot = EngineSlot::new();
        assert!(!slot.is_occupied().await);
        assert!(slot.take().await.is_none());
    }

    #[tokio::test]
    async fn register_then_take() {
        let slot = EngineSlot::new();
        let (endpoint, _token) = memory_endpoint("engine-a");

        slot.register(endpoint).await;
        assert!(slot.is_occupied().await);

        let taken = slot.take().await.unwrap();
        assert_eq!(taken.peer(), "engine-a");
        assert!(!slot.is_occupied().await, "take must empty the slot");
    }

    #[tokio::test]
    async fn last_writer_wins_and_closes_the_loser() {
        let slot = EngineSlot::new();
        let (first, first_token) = memory_endpoint("engine-a");
        let (second, second_token) = memory_endpoint("engine-b");

        slot.register(first).await;
        slot.register(second).await;

        assert!(first_token.is_cancelled(), "replaced endpoint must be closed");
        assert!(!second_token.is_cancelled());

        let taken = slot.take().await.unwrap();
        assert_eq!(taken.peer(), "engine-b");
    }
}
