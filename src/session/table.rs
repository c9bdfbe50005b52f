//! Connected session table
//!
//! Each connected session owns a bounded outbound queue drained by its
//! writer task. Emission never blocks: an event for a session whose queue is
//! full is dropped for that session only.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};

use crate::protocol::ServerEvent;
use crate::registry::SessionId;

/// Outcome of delivering one event to one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued for the session's writer
    Sent,
    /// Session queue full, event dropped
    QueueFull,
    /// Session is not connected
    NotConnected,
}

/// Totals for a broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Sessions the event was queued for
    pub delivered: usize,
    /// Sessions whose queue was full
    pub dropped: usize,
}

/// Table of connected sessions and their outbound queues
pub struct SessionTable {
    sessions: RwLock<HashMap<SessionId, mpsc::Sender<ServerEvent>>>,
    next_session_id: AtomicU64,
    queue_capacity: usize,
}

impl SessionTable {
    /// Create a table whose sessions buffer up to `queue_capacity` events
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_session_id: AtomicU64::new(1),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Allocate a session id and its outbound queue
    pub async fn open(&self) -> (SessionId, mpsc::Receiver<ServerEvent>) {
        let id = SessionId(self.next_session_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.queue_capacity);

        self.sessions.write().await.insert(id, tx);
        tracing::debug!(session_id = %id, "Session opened");

        (id, rx)
    }

    /// Drop a session's queue. Returns false if it was already gone.
    pub async fn close(&self, id: SessionId) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            tracing::debug!(session_id = %id, "Session closed");
        }
        removed
    }

    /// Queue an event for one session
    pub async fn send(&self, id: SessionId, event: ServerEvent) -> Delivery {
        let sessions = self.sessions.read().await;

        match sessions.get(&id) {
            Some(tx) => Self::deliver(id, tx, event),
            None => Delivery::NotConnected,
        }
    }

    /// Queue an event for every session, optionally skipping one
    pub async fn broadcast(&self, event: &ServerEvent, except: Option<SessionId>) -> BroadcastReport {
        let sessions = self.sessions.read().await;
        let mut report = BroadcastReport::default();

        for (id, tx) in sessions.iter() {
            if Some(*id) == except {
                continue;
            }
            match Self::deliver(*id, tx, event.clone()) {
                Delivery::Sent => report.delivered += 1,
                Delivery::QueueFull => report.dropped += 1,
                Delivery::NotConnected => {}
            }
        }

        tracing::trace!(
            event = event.name(),
            delivered = report.delivered,
            dropped = report.dropped,
            "Broadcast"
        );

        report
    }

    fn deliver(id: SessionId, tx: &mpsc::Sender<ServerEvent>, event: ServerEvent) -> Delivery {
        match tx.try_send(event) {
            Ok(()) => Delivery::Sent,
            Err(TrySendError::Full(event)) => {
                tracing::warn!(
                    session_id = %id,
                    event = event.name(),
                    "Session queue full, dropping event"
                );
                Delivery::QueueFull
            }
            // Writer already gone; disconnect cleanup is on its way
            Err(TrySendError::Closed(_)) => Delivery::NotConnected,
        }
    }

    /// Whether a session is connected
    pub async fn contains(&self, id: SessionId) -> bool {
        self.sessions.read().await.contains_key(&id)
    }

    /// Number of connected sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::registry::DeviceId;

    use super::*;

    fn available(id: &str) -> ServerEvent {
        ServerEvent::BroadcasterAvailable {
            device_id: DeviceId::new(id),
        }
    }

    #[tokio::test]
    async fn test_open_allocates_distinct_ids() {
        let table = SessionTable::new(8);
        let (a, _rx_a) = table.open().await;
        let (b, _rx_b) = table.open().await;

        assert_ne!(a, b);
        assert_eq!(table.len().await, 2);
    }

    #[tokio::test]
    async fn test_send_preserves_order() {
        let table = SessionTable::new(8);
        let (id, mut rx) = table.open().await;

        for name in ["a", "b", "c"] {
            assert_eq!(table.send(id, available(name)).await, Delivery::Sent);
        }

        assert_eq!(rx.recv().await, Some(available("a")));
        assert_eq!(rx.recv().await, Some(available("b")));
        assert_eq!(rx.recv().await, Some(available("c")));
    }

    #[tokio::test]
    async fn test_send_to_unknown_session() {
        let table = SessionTable::new(8);
        assert_eq!(
            table.send(SessionId(99), available("x")).await,
            Delivery::NotConnected
        );
    }

    #[tokio::test]
    async fn test_broadcast_skips_sender() {
        let table = SessionTable::new(8);
        let (a, mut rx_a) = table.open().await;
        let (_b, mut rx_b) = table.open().await;

        let report = table.broadcast(&available("dev"), Some(a)).await;
        assert_eq!(report.delivered, 1);

        assert_eq!(rx_b.recv().await, Some(available("dev")));
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_queue_drops_only_for_that_session() {
        let table = SessionTable::new(1);
        let (_slow, _rx_slow) = table.open().await;
        let (_fast, mut rx_fast) = table.open().await;

        table.broadcast(&available("1"), None).await;
        // Drain only the fast session
        rx_fast.recv().await;

        let report = table.broadcast(&available("2"), None).await;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(rx_fast.recv().await, Some(available("2")));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let table = SessionTable::new(4);
        let (id, _rx) = table.open().await;

        assert!(table.close(id).await);
        assert!(!table.close(id).await);
        assert!(table.is_empty().await);
    }
}
