//! Registry entry and role types
//!
//! This module defines the per-session and per-viewer state stored in the
//! registry, plus the removal report handed back on cleanup.

use serde::Serialize;

use super::id::{DeviceId, SessionId, ViewerId};

/// Role a session holds in the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRole {
    /// Connected but not registered
    Unassigned,
    /// Publishing frames for a device
    Broadcaster(DeviceId),
    /// Consuming a broadcaster's stream
    Viewer(ViewerId),
}

impl SessionRole {
    /// Short role name for logs and health output
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionRole::Unassigned => "unassigned",
            SessionRole::Broadcaster(_) => "broadcaster",
            SessionRole::Viewer(_) => "viewer",
        }
    }
}

/// Registry entry for a viewer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerEntry {
    /// Session currently carrying this viewer
    pub session_id: SessionId,
    /// Device being watched, once a stream was requested
    pub watching: Option<DeviceId>,
}

impl ViewerEntry {
    pub(super) fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            watching: None,
        }
    }
}

/// Notification owed to a broadcaster when one of its viewers leaves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerDeparture {
    /// Broadcaster session to notify
    pub broadcaster: SessionId,
    /// Device the viewer was watching
    pub device_id: DeviceId,
    /// Departing viewer session
    pub viewer_session: SessionId,
}

/// Everything a cleanup pass removed for one session
///
/// An empty removal means the session held nothing, which makes repeated
/// cleanup for the same session a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRemoval {
    /// Session that was cleaned up
    pub session_id: SessionId,
    /// Role the session held before cleanup
    pub role: SessionRole,
    /// Devices whose broadcaster mapping was removed
    pub released_devices: Vec<DeviceId>,
    /// Viewer departure to report to a live broadcaster
    pub departure: Option<ViewerDeparture>,
}

impl SessionRemoval {
    pub(super) fn empty(session_id: SessionId) -> Self {
        Self {
            session_id,
            role: SessionRole::Unassigned,
            released_devices: Vec::new(),
            departure: None,
        }
    }

    /// Whether nothing needs to be announced
    pub fn is_noop(&self) -> bool {
        self.released_devices.is_empty() && self.departure.is_none()
    }
}

/// Result of a broadcaster registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcasterRegistration {
    /// Previous session for the device, if a different one was superseded
    pub superseded: Option<SessionId>,
    /// Registrations the session gave up by changing role or device
    pub released: SessionRemoval,
}

/// Result of a viewer registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerRegistration {
    /// Devices with a live broadcaster at registration time
    pub available: Vec<DeviceId>,
    /// Previous session for the viewer id, if a different one was superseded
    pub superseded: Option<SessionId>,
    /// Registrations the session gave up by changing role or id
    pub released: SessionRemoval,
}

/// Counts snapshot for health reporting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// Devices with a live broadcaster
    pub broadcasters: usize,
    /// Registered viewers
    pub viewers: usize,
    /// Devices ever announced by a registration or a frame
    pub seen_devices: usize,
    /// Viewers currently attached to some device
    pub watching: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_removal_is_noop() {
        let removal = SessionRemoval::empty(SessionId(3));
        assert!(removal.is_noop());
        assert_eq!(removal.role, SessionRole::Unassigned);
    }

    #[test]
    fn test_role_names() {
        assert_eq!(SessionRole::Unassigned.as_str(), "unassigned");
        assert_eq!(SessionRole::Broadcaster(DeviceId::new("d")).as_str(), "broadcaster");
        assert_eq!(SessionRole::Viewer(ViewerId::new("v")).as_str(), "viewer");
    }
}
