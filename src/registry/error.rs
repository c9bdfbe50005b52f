//! Registry error types
//!
//! Routing failures surfaced to the requesting session as `error` events.

use super::id::{DeviceId, SessionId};

/// Error type for registry and routing operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No broadcaster is registered for the device
    DeviceNotRegistered(DeviceId),
    /// Signaling target is not a connected session
    SessionNotConnected(SessionId),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::DeviceNotRegistered(device) => {
                write!(f, "Device not registered: {}", device)
            }
            RegistryError::SessionNotConnected(session) => {
                write!(f, "Session not connected: {}", session)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
