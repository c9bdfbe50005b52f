//! Identity types for registry routing
//!
//! Sessions are addressed by a numeric id allocated by the session table.
//! Devices and viewers carry client-chosen string identities.

use serde::{Deserialize, Serialize};

/// Transport-level session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Broadcaster device identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a new device id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is empty or whitespace only
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Viewer identity, independent of the transport session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewerId(String);

impl ViewerId {
    /// Create a new viewer id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Viewer id used for sessions that request a stream without registering
    pub fn implicit(session: SessionId) -> Self {
        Self(format!("session-{}", session))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for ViewerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_serializes_as_number() {
        let json = serde_json::to_string(&SessionId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_blank_ids() {
        assert!(DeviceId::new("  ").is_blank());
        assert!(!DeviceId::new("dev1").is_blank());
        assert!(ViewerId::new("").is_blank());
    }

    #[test]
    fn test_implicit_viewer_id() {
        assert_eq!(ViewerId::implicit(SessionId(7)).as_str(), "session-7");
    }
}
