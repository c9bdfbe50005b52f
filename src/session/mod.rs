//! Session management
//!
//! Sessions are the transport-level identities of connected clients. The
//! hub addresses them only by [`SessionId`](crate::registry::SessionId)
//! through the [`SessionTable`].

pub mod context;
pub mod table;

pub use context::SessionContext;
pub use table::{BroadcastReport, Delivery, SessionTable};
