//! Session context
//!
//! Read-only information about a connected session, carried by its
//! connection task for logging and lifetime tracking.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::registry::SessionId;

/// Context for one event-channel connection
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Unique session ID
    pub session_id: SessionId,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// When the transport connected
    pub connected_at: Instant,
}

impl SessionContext {
    /// Create a new context
    pub fn new(session_id: SessionId, peer_addr: SocketAddr) -> Self {
        Self {
            session_id,
            peer_addr,
            connected_at: Instant::now(),
        }
    }

    /// Time since the transport connected
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
