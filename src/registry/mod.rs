//! Connection registry for signaling and presence
//!
//! The registry is the source of truth for which session broadcasts which
//! device, which viewer rides on which session, and which viewer sessions
//! watch each device.
//!
//! # Architecture
//!
//! ```text
//!                        ConnectionRegistry
//!              ┌─────────────────────────────────────┐
//!              │ RwLock<Tables {                     │
//!              │   broadcasters: DeviceId → Session, │
//!              │   viewers:      ViewerId → Entry,   │
//!              │   viewer_sets:  DeviceId → {Session}│
//!              │   roles:        Session  → Role,    │
//!              │ }>                                  │
//!              └──────────────────┬──────────────────┘
//!                                 │
//!        ┌────────────────────────┼────────────────────────┐
//!        │                        │                        │
//!        ▼                        ▼                        ▼
//!  register_broadcaster     attach_viewer           remove_session
//!  register_viewer          (request-stream)        (disconnect)
//! ```
//!
//! # Invariants
//!
//! - At most one broadcaster session per device; the newest registration
//!   wins.
//! - Every viewer-set member is the session of a registered viewer.
//! - After `remove_session`, no table references the session.

pub mod entry;
pub mod error;
pub mod id;
pub mod store;

pub use entry::{
    BroadcasterRegistration, RegistryStats, SessionRemoval, SessionRole, ViewerDeparture,
    ViewerEntry, ViewerRegistration,
};
pub use error::RegistryError;
pub use id::{DeviceId, SessionId, ViewerId};
pub use store::{ConnectionRegistry, StreamAttachment};
