//! Event-channel wire protocol
//!
//! Inbound events are parsed into [`ClientEvent`] and validated before any
//! handler sees them. Outbound events are built as [`ServerEvent`] values and
//! serialized by each session's writer task.

pub mod event;
pub mod message;

pub use event::{
    ClientEvent, DetectionReport, FramePacket, IceSignal, RegisterBroadcaster, RegisterViewer,
    SdpSignal, StreamRequest, StreamingState, StreamingStatus,
};
pub use message::{FrameUpdate, ServerEvent, SignalKind, SignalingMessage};
