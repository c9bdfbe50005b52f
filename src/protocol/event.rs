//! Inbound client events
//!
//! Every text frame on the event channel is a JSON object of the form
//! `{"event": <name>, "data": <payload>}`. Unknown events, missing fields
//! and blank identifiers are rejected at the boundary. Frame and detection
//! metadata the hub only passes through (timestamps, dimensions) is kept as
//! raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtocolError;
use crate::registry::{DeviceId, SessionId, ViewerId};

/// Event sent by a client session
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "register-broadcaster")]
    RegisterBroadcaster(RegisterBroadcaster),
    #[serde(rename = "register-viewer")]
    RegisterViewer(RegisterViewer),
    /// Ask for the current broadcaster list without registering
    #[serde(rename = "get-broadcasters")]
    GetBroadcasters,
    #[serde(rename = "request-stream")]
    RequestStream(StreamRequest),
    #[serde(rename = "offer")]
    Offer(SdpSignal),
    #[serde(rename = "answer")]
    Answer(SdpSignal),
    #[serde(rename = "ice-candidate")]
    IceCandidate(IceSignal),
    #[serde(rename = "video_frame")]
    VideoFrame(FramePacket),
    #[serde(rename = "device_streaming")]
    DeviceStreaming(StreamingStatus),
    #[serde(rename = "person_detection")]
    PersonDetection(DetectionReport),
}

impl ClientEvent {
    /// Parse and validate a text frame
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;

        // The list query has no payload; clients send `{}`, `null` or nothing
        if value.get("event").and_then(Value::as_str) == Some("get-broadcasters") {
            return Ok(ClientEvent::GetBroadcasters);
        }

        let event = ClientEvent::deserialize(value)?;
        event.validate()?;
        Ok(event)
    }

    /// Check required identifiers are present and non-blank
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            ClientEvent::RegisterBroadcaster(msg) if msg.device_id.is_blank() => {
                Err(ProtocolError::MissingField("deviceId"))
            }
            ClientEvent::RegisterViewer(msg) if msg.viewer_id.is_blank() => {
                Err(ProtocolError::MissingField("viewerId"))
            }
            ClientEvent::RequestStream(msg) if msg.device_id.is_blank() => {
                Err(ProtocolError::MissingField("deviceId"))
            }
            ClientEvent::VideoFrame(frame) if frame.device_id.is_blank() => {
                Err(ProtocolError::MissingField("device_id"))
            }
            ClientEvent::DeviceStreaming(msg) if msg.device_id.is_blank() => {
                Err(ProtocolError::MissingField("device_id"))
            }
            ClientEvent::PersonDetection(msg) if msg.device_id.is_blank() => {
                Err(ProtocolError::MissingField("deviceId"))
            }
            _ => Ok(()),
        }
    }

    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::RegisterBroadcaster(_) => "register-broadcaster",
            ClientEvent::RegisterViewer(_) => "register-viewer",
            ClientEvent::GetBroadcasters => "get-broadcasters",
            ClientEvent::RequestStream(_) => "request-stream",
            ClientEvent::Offer(_) => "offer",
            ClientEvent::Answer(_) => "answer",
            ClientEvent::IceCandidate(_) => "ice-candidate",
            ClientEvent::VideoFrame(_) => "video_frame",
            ClientEvent::DeviceStreaming(_) => "device_streaming",
            ClientEvent::PersonDetection(_) => "person_detection",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBroadcaster {
    pub device_id: DeviceId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterViewer {
    pub viewer_id: ViewerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRequest {
    pub device_id: DeviceId,
}

/// Offer or answer addressed to another session
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SdpSignal {
    pub target: SessionId,
    /// Opaque session description
    pub sdp: Value,
}

/// ICE candidate addressed to another session
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IceSignal {
    pub target: SessionId,
    /// Opaque candidate
    pub candidate: Value,
}

/// Video frame metadata published by a broadcaster
///
/// Also the body of federation relay requests. Fields the hub does not know
/// about are kept in `extra` and passed through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramePacket {
    pub device_id: DeviceId,
    /// Monotonic per device, gaps allowed
    pub frame_number: u64,
    /// Passed through as sent (epoch number or ISO string)
    pub timestamp: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FramePacket {
    /// Create a frame with only the required fields
    pub fn new(device_id: DeviceId, frame_number: u64, timestamp: impl Into<Value>) -> Self {
        Self {
            device_id,
            frame_number,
            timestamp: timestamp.into(),
            width: None,
            height: None,
            format: None,
            extra: Map::new(),
        }
    }

    /// Decode a relayed frame body
    pub fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        let frame: FramePacket = serde_json::from_slice(body)?;
        if frame.device_id.is_blank() {
            return Err(ProtocolError::MissingField("device_id"));
        }
        Ok(frame)
    }

    /// Set frame dimensions
    pub fn dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width.into());
        self.height = Some(height.into());
        self
    }

    /// Set pixel/container format
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

/// Soft presence state reported by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamingState {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StreamingStatus {
    pub device_id: DeviceId,
    pub status: StreamingState,
}

/// Person-detection result from a broadcaster
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionReport {
    pub device_id: DeviceId,
    /// Zero means no persons in frame
    pub person_count: u32,
    pub timestamp: Value,
}
