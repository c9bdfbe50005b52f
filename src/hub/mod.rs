//! The signaling and relay hub
//!
//! [`Hub`] owns the connection registry, the session table and the
//! federation relay. Transports feed it inbound events per session and
//! drain each session's outbound queue.
//!
//! Handlers are split by concern:
//!
//! - [`signaling`]: registration, stream requests, offer/answer/ICE relay
//! - [`fanout`]: frame, detection and presence broadcasts
//! - [`presence`]: disconnect cleanup and notifications
//!
//! No handler returns an error to the transport. Malformed events are
//! logged and dropped; routing failures become `error` events for the
//! requester.

pub mod config;
pub mod fanout;
pub mod presence;
pub mod signaling;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

pub use config::HubConfig;

use crate::error::{ProtocolError, Result};
use crate::federation::FederationRelay;
use crate::protocol::{ClientEvent, ServerEvent, SignalKind, SignalingMessage};
use crate::registry::{ConnectionRegistry, DeviceId, RegistryStats, SessionId};
use crate::session::{BroadcastReport, Delivery, SessionTable};
use crate::stats::{HubStats, StatsSnapshot};

/// Central hub shared by all connections
pub struct Hub {
    config: HubConfig,
    registry: ConnectionRegistry,
    sessions: SessionTable,
    federation: FederationRelay,
    stats: Arc<HubStats>,
}

impl Hub {
    /// Create a hub
    ///
    /// Fails only if the federation HTTP client cannot be built.
    pub fn new(config: HubConfig) -> Result<Self> {
        let stats = Arc::new(HubStats::new());
        let federation = FederationRelay::new(config.federation.clone(), Arc::clone(&stats))?;

        Ok(Self {
            registry: ConnectionRegistry::new(),
            sessions: SessionTable::new(config.session_queue_capacity),
            federation,
            stats,
            config,
        })
    }

    /// Get the hub configuration
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Get the connection registry
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Get the session table
    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    /// Get the federation relay
    pub fn federation(&self) -> &FederationRelay {
        &self.federation
    }

    /// Get the hub counters
    pub fn stats(&self) -> &HubStats {
        &self.stats
    }

    /// Open a session for a new transport connection
    ///
    /// Returns the session id and the queue of events to write to it. The
    /// first queued event is `connection_status`.
    pub async fn connect(&self) -> (SessionId, mpsc::Receiver<ServerEvent>) {
        let (session_id, rx) = self.sessions.open().await;
        HubStats::bump(&self.stats.total_connections);

        self.emit(
            session_id,
            ServerEvent::ConnectionStatus {
                status: "connected",
                session_id,
            },
        )
        .await;

        tracing::info!(session_id = %session_id, "Session connected");

        (session_id, rx)
    }

    /// Parse and dispatch one text frame from a session
    pub async fn handle_text(&self, session_id: SessionId, text: &str) {
        match ClientEvent::parse(text) {
            Ok(event) => self.handle_event(session_id, event).await,
            Err(e) => self.reject(session_id, e),
        }
    }

    /// Record and drop a malformed event
    pub fn reject(&self, session_id: SessionId, error: ProtocolError) {
        HubStats::bump(&self.stats.events_rejected);
        tracing::warn!(session_id = %session_id, error = %error, "Dropping malformed event");
    }

    /// Dispatch a validated event
    pub async fn handle_event(&self, session_id: SessionId, event: ClientEvent) {
        tracing::debug!(session_id = %session_id, event = event.name(), "Event received");

        match event {
            ClientEvent::RegisterBroadcaster(msg) => {
                self.register_broadcaster(session_id, msg.device_id).await
            }
            ClientEvent::RegisterViewer(msg) => self.register_viewer(session_id, msg.viewer_id).await,
            ClientEvent::GetBroadcasters => self.send_broadcaster_list(session_id).await,
            ClientEvent::RequestStream(msg) => {
                // Failure already reported to the requester
                let _ = self.request_stream(session_id, msg.device_id).await;
            }
            ClientEvent::Offer(signal) => {
                let _ = self
                    .relay(SignalingMessage {
                        kind: SignalKind::Offer,
                        sender: session_id,
                        target: signal.target,
                        payload: signal.sdp,
                    })
                    .await;
            }
            ClientEvent::Answer(signal) => {
                let _ = self
                    .relay(SignalingMessage {
                        kind: SignalKind::Answer,
                        sender: session_id,
                        target: signal.target,
                        payload: signal.sdp,
                    })
                    .await;
            }
            ClientEvent::IceCandidate(signal) => {
                let _ = self
                    .relay(SignalingMessage {
                        kind: SignalKind::IceCandidate,
                        sender: session_id,
                        target: signal.target,
                        payload: signal.candidate,
                    })
                    .await;
            }
            ClientEvent::VideoFrame(frame) => self.on_frame(session_id, frame).await,
            ClientEvent::DeviceStreaming(status) => {
                self.on_device_streaming(session_id, status).await
            }
            ClientEvent::PersonDetection(report) => self.on_detection(session_id, report).await,
        }
    }

    /// Queue an event for one session
    pub(crate) async fn emit(&self, session_id: SessionId, event: ServerEvent) -> Delivery {
        let delivery = self.sessions.send(session_id, event).await;
        if delivery == Delivery::QueueFull {
            HubStats::bump(&self.stats.events_dropped);
        }
        delivery
    }

    /// Queue an event for every session, optionally skipping one
    pub(crate) async fn broadcast(
        &self,
        event: ServerEvent,
        except: Option<SessionId>,
    ) -> BroadcastReport {
        let report = self.sessions.broadcast(&event, except).await;
        HubStats::add(&self.stats.events_dropped, report.dropped);
        report
    }

    /// Build the health report
    pub async fn health(&self) -> HealthReport {
        HealthReport {
            status: "ok",
            sessions: self.sessions.len().await,
            registry: self.registry.stats().await,
            active_devices: self.registry.active_devices().await,
            seen_devices: self.registry.seen_devices().await,
            federation_peers: self.federation.peer_count(),
            federation_in_flight: self.federation.in_flight().await,
            frame_rate: self.stats.frame_rate(),
            stats: self.stats.snapshot(),
        }
    }

    /// Cancel outstanding federation relays
    pub async fn shutdown(&self) {
        self.federation.shutdown().await;
        tracing::info!("Hub shut down");
    }
}

/// Health summary served on `/health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub sessions: usize,
    pub registry: RegistryStats,
    pub active_devices: Vec<DeviceId>,
    pub seen_devices: Vec<DeviceId>,
    pub federation_peers: usize,
    pub federation_in_flight: usize,
    /// Average local frames per second since start
    pub frame_rate: f64,
    pub stats: StatsSnapshot,
}

#[cfg(test)]
pub(crate) mod test_support {
    use tokio::sync::mpsc;

    use super::*;

    /// Drain everything currently queued for a session
    pub fn drain(rx: &mut mpsc::Receiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Connect a session and discard its `connection_status` greeting
    pub async fn connect(hub: &Hub) -> (SessionId, mpsc::Receiver<ServerEvent>) {
        let (id, mut rx) = hub.connect().await;
        drain(&mut rx);
        (id, rx)
    }

    pub fn hub() -> Hub {
        Hub::new(HubConfig::default()).unwrap()
    }
}
