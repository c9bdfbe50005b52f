//! Signaling and frame relay hub for live mobile broadcasters and viewers
//!
//! Broadcasters register a device id, viewers register and request a
//! device's stream, and the hub relays WebRTC negotiation messages between
//! them. Frame metadata, detection results and presence changes are fanned
//! out to every connected session, and a sampled subset of frames is
//! forwarded to peer hubs over HTTP.
//!
//! # Example
//!
//! ```no_run
//! use relay_hub::{HubServer, ServerConfig};
//!
//! # async fn run() -> relay_hub::Result<()> {
//! let config = ServerConfig::default().peer("http://10.0.0.2:8080");
//! let server = HubServer::new(config)?;
//! server.run_until(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! }).await
//! # }
//! ```

pub mod error;
pub mod federation;
pub mod hub;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, ProtocolError, Result};
pub use federation::{FederationConfig, FederationRelay};
pub use hub::{HealthReport, Hub, HubConfig};
pub use protocol::{ClientEvent, FramePacket, ServerEvent};
pub use registry::{ConnectionRegistry, DeviceId, SessionId, ViewerId};
pub use server::{HubServer, ServerConfig};
