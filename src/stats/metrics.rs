//! Statistics and counters for the hub

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Hub-wide counters
///
/// Updated with relaxed atomics from any handler; read as a
/// [`StatsSnapshot`] for health reporting.
#[derive(Debug)]
pub struct HubStats {
    /// Start time
    started_at: Instant,
    /// Event-channel connections ever accepted
    pub total_connections: AtomicU64,
    /// Frames received from local broadcasters
    pub frames_received: AtomicU64,
    /// Frames received from peer hubs
    pub frames_federated_in: AtomicU64,
    /// Detection events fanned out
    pub detections: AtomicU64,
    /// Offer/answer/ICE messages relayed
    pub signals_relayed: AtomicU64,
    /// Inbound events rejected as malformed
    pub events_rejected: AtomicU64,
    /// Outbound events dropped on full session queues
    pub events_dropped: AtomicU64,
    /// Federation POSTs that completed with a success status
    pub federation_sent: AtomicU64,
    /// Federation POSTs that failed or timed out
    pub federation_failed: AtomicU64,
    /// Federation POSTs skipped because too many were in flight
    pub federation_skipped: AtomicU64,
}

impl HubStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_connections: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            frames_federated_in: AtomicU64::new(0),
            detections: AtomicU64::new(0),
            signals_relayed: AtomicU64::new(0),
            events_rejected: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            federation_sent: AtomicU64::new(0),
            federation_failed: AtomicU64::new(0),
            federation_skipped: AtomicU64::new(0),
        }
    }

    /// Increment a counter by one
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Add to a counter
    pub fn add(counter: &AtomicU64, n: usize) {
        if n > 0 {
            counter.fetch_add(n as u64, Ordering::Relaxed);
        }
    }

    /// Time since the hub started
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Average local frame rate since start
    pub fn frame_rate(&self) -> f64 {
        let secs = self.uptime().as_secs_f64();
        if secs > 0.0 {
            self.frames_received.load(Ordering::Relaxed) as f64 / secs
        } else {
            0.0
        }
    }

    /// Copy all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);

        StatsSnapshot {
            uptime_secs: self.uptime().as_secs(),
            total_connections: load(&self.total_connections),
            frames_received: load(&self.frames_received),
            frames_federated_in: load(&self.frames_federated_in),
            detections: load(&self.detections),
            signals_relayed: load(&self.signals_relayed),
            events_rejected: load(&self.events_rejected),
            events_dropped: load(&self.events_dropped),
            federation_sent: load(&self.federation_sent),
            federation_failed: load(&self.federation_failed),
            federation_skipped: load(&self.federation_skipped),
        }
    }
}

impl Default for HubStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`HubStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub uptime_secs: u64,
    pub total_connections: u64,
    pub frames_received: u64,
    pub frames_federated_in: u64,
    pub detections: u64,
    pub signals_relayed: u64,
    pub events_rejected: u64,
    pub events_dropped: u64,
    pub federation_sent: u64,
    pub federation_failed: u64,
    pub federation_skipped: u64,
}
