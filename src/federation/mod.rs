//! Cross-hub frame federation
//!
//! A hub forwards a sampled subset of its local frames to every configured
//! peer hub over HTTP. Peers re-broadcast what they receive to their own
//! sessions. Frames received from a peer are never forwarded again, so
//! mutually peered hubs do not loop.
//!
//! ```text
//!   hub A                                   hub B
//!   video_frame ──► fan-out (local)
//!        │
//!        └─► forward() ── POST /api/relay/video_frame ──► fan-out (local)
//!            (even frames, 1s timeout, no retry)
//! ```
//!
//! There is no dedup key, so a viewer connected to several federated hubs
//! can see the same frame more than once.

pub mod config;
pub mod error;
pub mod relay;

pub use config::FederationConfig;
pub use error::FederationError;
pub use relay::{relay_endpoint, FederationRelay};

/// HTTP path peers accept relayed frames on
pub const RELAY_PATH: &str = "/api/relay/video_frame";
