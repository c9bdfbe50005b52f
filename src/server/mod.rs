//! HTTP and WebSocket server
//!
//! ```text
//!   GET  /ws                      event channel (one session per socket)
//!   GET  /health                  counts, device lists, counters
//!   GET  /api/devices             {"devices": [...]}
//!   POST /api/relay/video_frame   frames relayed by peer hubs
//! ```

pub mod config;
pub mod connection;
pub mod http;
pub mod listener;

pub use config::ServerConfig;
pub use connection::Connection;
pub use http::{router, AppState};
pub use listener::HubServer;
