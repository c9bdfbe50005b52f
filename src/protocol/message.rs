//! Outbound server events
//!
//! Serialized with the same `{"event": <name>, "data": <payload>}` envelope
//! as inbound events.

use serde::Serialize;
use serde_json::{Map, Value};

use super::event::{FramePacket, StreamingState};
use crate::registry::{DeviceId, SessionId};

/// Event delivered to a client session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "connection_status", rename_all = "camelCase")]
    ConnectionStatus {
        status: &'static str,
        session_id: SessionId,
    },
    #[serde(rename = "broadcaster-available", rename_all = "camelCase")]
    BroadcasterAvailable { device_id: DeviceId },
    #[serde(rename = "available-broadcasters")]
    AvailableBroadcasters(Vec<DeviceId>),
    #[serde(rename = "viewer-joined", rename_all = "camelCase")]
    ViewerJoined { viewer_id: SessionId },
    #[serde(rename = "viewer-disconnected", rename_all = "camelCase")]
    ViewerDisconnected { viewer_id: SessionId },
    #[serde(rename = "broadcaster-disconnected", rename_all = "camelCase")]
    BroadcasterDisconnected { device_id: DeviceId },
    #[serde(rename = "offer")]
    Offer { sender: SessionId, sdp: Value },
    #[serde(rename = "answer")]
    Answer { sender: SessionId, sdp: Value },
    #[serde(rename = "ice-candidate")]
    IceCandidate { sender: SessionId, candidate: Value },
    #[serde(rename = "video_frame_update")]
    VideoFrameUpdate(FrameUpdate),
    #[serde(rename = "detection-update", rename_all = "camelCase")]
    DetectionUpdate {
        device_id: DeviceId,
        person_count: u32,
        timestamp: Value,
        source: SessionId,
    },
    #[serde(rename = "device-status", rename_all = "camelCase")]
    DeviceStatus {
        device_id: DeviceId,
        status: StreamingState,
    },
    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::ConnectionStatus { .. } => "connection_status",
            ServerEvent::BroadcasterAvailable { .. } => "broadcaster-available",
            ServerEvent::AvailableBroadcasters(_) => "available-broadcasters",
            ServerEvent::ViewerJoined { .. } => "viewer-joined",
            ServerEvent::ViewerDisconnected { .. } => "viewer-disconnected",
            ServerEvent::BroadcasterDisconnected { .. } => "broadcaster-disconnected",
            ServerEvent::Offer { .. } => "offer",
            ServerEvent::Answer { .. } => "answer",
            ServerEvent::IceCandidate { .. } => "ice-candidate",
            ServerEvent::VideoFrameUpdate(_) => "video_frame_update",
            ServerEvent::DetectionUpdate { .. } => "detection-update",
            ServerEvent::DeviceStatus { .. } => "device-status",
            ServerEvent::Error { .. } => "error",
        }
    }

    /// Create an error event
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }

    /// Serialize to the JSON envelope
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Frame metadata as fanned out to sessions
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameUpdate {
    pub device_id: DeviceId,
    pub frame_number: u64,
    pub timestamp: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<&FramePacket> for FrameUpdate {
    fn from(frame: &FramePacket) -> Self {
        Self {
            device_id: frame.device_id.clone(),
            frame_number: frame.frame_number,
            timestamp: frame.timestamp.clone(),
            width: frame.width.clone(),
            height: frame.height.clone(),
            format: frame.format.clone(),
            extra: frame.extra.clone(),
        }
    }
}

/// Kind of negotiation message carried by the signaling router
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Offer => "offer",
            SignalKind::Answer => "answer",
            SignalKind::IceCandidate => "ice-candidate",
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Negotiation message between two sessions
///
/// The payload is never inspected; pairing offers with answers is the
/// clients' job.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalingMessage {
    pub kind: SignalKind,
    pub sender: SessionId,
    pub target: SessionId,
    pub payload: Value,
}

impl SignalingMessage {
    /// Event delivered to the target, tagged with the sender
    pub fn into_event(self) -> ServerEvent {
        match self.kind {
            SignalKind::Offer => ServerEvent::Offer {
                sender: self.sender,
                sdp: self.payload,
            },
            SignalKind::Answer => ServerEvent::Answer {
                sender: self.sender,
                sdp: self.payload,
            },
            SignalKind::IceCandidate => ServerEvent::IceCandidate {
                sender: self.sender,
                candidate: self.payload,
            },
        }
    }
}
