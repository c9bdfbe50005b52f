//! Connection registry implementation
//!
//! The central registry that maps device and viewer identities to sessions
//! and tracks which viewer sessions watch which device.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use super::entry::{
    BroadcasterRegistration, RegistryStats, SessionRemoval, SessionRole, ViewerDeparture,
    ViewerEntry, ViewerRegistration,
};
use super::error::RegistryError;
use super::id::{DeviceId, SessionId, ViewerId};

/// Outcome of attaching a viewer session to a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamAttachment {
    /// Broadcaster session that should be told about the viewer
    pub broadcaster: SessionId,
    /// Viewer identity the session is registered under
    pub viewer_id: ViewerId,
    /// Registrations the session gave up to become a viewer
    pub released: SessionRemoval,
}

#[derive(Default)]
struct RegistryTables {
    broadcasters: HashMap<DeviceId, SessionId>,
    viewers: HashMap<ViewerId, ViewerEntry>,
    viewer_sets: HashMap<DeviceId, HashSet<SessionId>>,
    roles: HashMap<SessionId, SessionRole>,
}

impl RegistryTables {
    /// Drop everything the session holds under its current role
    fn release(&mut self, session_id: SessionId) -> SessionRemoval {
        let Some(role) = self.roles.remove(&session_id) else {
            return SessionRemoval::empty(session_id);
        };

        let mut removal = SessionRemoval::empty(session_id);
        removal.role = role.clone();

        match role {
            SessionRole::Broadcaster(device) => {
                // A superseded session no longer owns the mapping
                if self.broadcasters.get(&device) == Some(&session_id) {
                    self.broadcasters.remove(&device);
                    self.viewer_sets.remove(&device);
                    removal.released_devices.push(device);
                }
            }
            SessionRole::Viewer(viewer_id) => {
                let owned = self
                    .viewers
                    .get(&viewer_id)
                    .is_some_and(|entry| entry.session_id == session_id);

                if owned {
                    if let Some(entry) = self.viewers.remove(&viewer_id) {
                        if let Some(device) = entry.watching {
                            if let Some(&broadcaster) = self.broadcasters.get(&device) {
                                removal.departure = Some(ViewerDeparture {
                                    broadcaster,
                                    device_id: device.clone(),
                                    viewer_session: session_id,
                                });
                            }
                            if let Some(set) = self.viewer_sets.get_mut(&device) {
                                set.remove(&session_id);
                            }
                        }
                    }
                }
            }
            SessionRole::Unassigned => {}
        }

        // Membership is normally confined to the watched device
        for set in self.viewer_sets.values_mut() {
            set.remove(&session_id);
        }

        removal
    }

    /// Release the session's previous registrations unless it already holds `role`
    fn assume_role(&mut self, session_id: SessionId, role: &SessionRole) -> SessionRemoval {
        let keep = match self.roles.get(&session_id) {
            None | Some(SessionRole::Unassigned) => true,
            Some(current) => current == role,
        };

        if keep {
            SessionRemoval::empty(session_id)
        } else {
            self.release(session_id)
        }
    }

    fn insert_viewer(&mut self, viewer_id: &ViewerId, session_id: SessionId) -> Option<SessionId> {
        let mut superseded = None;

        if let Some(previous) = self.viewers.remove(viewer_id) {
            if let Some(device) = previous.watching {
                if let Some(set) = self.viewer_sets.get_mut(&device) {
                    set.remove(&previous.session_id);
                }
            }
            if previous.session_id != session_id {
                let role = SessionRole::Viewer(viewer_id.clone());
                if self.roles.get(&previous.session_id) == Some(&role) {
                    self.roles
                        .insert(previous.session_id, SessionRole::Unassigned);
                }
                superseded = Some(previous.session_id);
            }
        }

        self.viewers
            .insert(viewer_id.clone(), ViewerEntry::new(session_id));
        self.roles
            .insert(session_id, SessionRole::Viewer(viewer_id.clone()));

        superseded
    }

    fn active_devices(&self) -> Vec<DeviceId> {
        let mut devices: Vec<DeviceId> = self.broadcasters.keys().cloned().collect();
        devices.sort();
        devices
    }
}

/// Central registry for broadcasters, viewers and viewer sets
///
/// All tables sit behind a single `RwLock`, so compound operations such as
/// "find broadcaster, then add to its viewer set" are atomic.
pub struct ConnectionRegistry {
    tables: RwLock<RegistryTables>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(RegistryTables::default()),
        }
    }

    /// Register a broadcaster session for a device
    ///
    /// The newest registration silently supersedes any previous session for
    /// the same device. The device's viewer set is created if absent.
    pub async fn register_broadcaster(
        &self,
        device_id: &DeviceId,
        session_id: SessionId,
    ) -> BroadcasterRegistration {
        let mut tables = self.tables.write().await;
        let role = SessionRole::Broadcaster(device_id.clone());

        let released = tables.assume_role(session_id, &role);

        let superseded = tables
            .broadcasters
            .insert(device_id.clone(), session_id)
            .filter(|previous| *previous != session_id);

        if let Some(previous) = superseded {
            if tables.roles.get(&previous) == Some(&role) {
                tables.roles.insert(previous, SessionRole::Unassigned);
            }
            tracing::info!(
                device = %device_id,
                previous_session = %previous,
                session_id = %session_id,
                "Broadcaster superseded"
            );
        }

        tables.viewer_sets.entry(device_id.clone()).or_default();
        tables.roles.insert(session_id, role);

        tracing::info!(
            device = %device_id,
            session_id = %session_id,
            "Broadcaster registered"
        );

        BroadcasterRegistration {
            superseded,
            released,
        }
    }

    /// Register a viewer session
    ///
    /// Returns the devices that currently have a broadcaster. The list is a
    /// snapshot and may be stale as soon as the lock is released.
    pub async fn register_viewer(
        &self,
        viewer_id: &ViewerId,
        session_id: SessionId,
    ) -> ViewerRegistration {
        let mut tables = self.tables.write().await;
        let role = SessionRole::Viewer(viewer_id.clone());

        let released = tables.assume_role(session_id, &role);
        let superseded = tables.insert_viewer(viewer_id, session_id);
        let available = tables.active_devices();

        tracing::info!(
            viewer = %viewer_id,
            session_id = %session_id,
            broadcasters = available.len(),
            "Viewer registered"
        );

        ViewerRegistration {
            available,
            superseded,
            released,
        }
    }

    /// Attach a viewer session to a device's stream
    ///
    /// Fails if the device has no broadcaster. A session that never
    /// registered as a viewer is registered under an implicit viewer id.
    pub async fn attach_viewer(
        &self,
        session_id: SessionId,
        device_id: &DeviceId,
    ) -> Result<StreamAttachment, RegistryError> {
        let mut tables = self.tables.write().await;

        let broadcaster = *tables
            .broadcasters
            .get(device_id)
            .ok_or_else(|| RegistryError::DeviceNotRegistered(device_id.clone()))?;

        let registered = match tables.roles.get(&session_id) {
            Some(SessionRole::Viewer(viewer_id)) => Some(viewer_id.clone()),
            _ => None,
        };

        let (viewer_id, released) = match registered {
            Some(viewer_id) => (viewer_id, SessionRemoval::empty(session_id)),
            None => {
                let viewer_id = ViewerId::implicit(session_id);
                let role = SessionRole::Viewer(viewer_id.clone());
                let released = tables.assume_role(session_id, &role);
                tables.insert_viewer(&viewer_id, session_id);
                tracing::debug!(
                    session_id = %session_id,
                    viewer = %viewer_id,
                    "Implicit viewer registration"
                );
                (viewer_id, released)
            }
        };

        let previous = tables
            .viewers
            .get_mut(&viewer_id)
            .and_then(|entry| entry.watching.replace(device_id.clone()));

        if let Some(previous) = previous.filter(|previous| previous != device_id) {
            if let Some(set) = tables.viewer_sets.get_mut(&previous) {
                set.remove(&session_id);
            }
        }

        let set = tables.viewer_sets.entry(device_id.clone()).or_default();
        set.insert(session_id);

        tracing::info!(
            device = %device_id,
            session_id = %session_id,
            viewers = set.len(),
            "Viewer attached"
        );

        Ok(StreamAttachment {
            broadcaster,
            viewer_id,
            released,
        })
    }

    /// Mark a device as seen, creating its viewer set if absent
    ///
    /// Returns true if the device was not seen before.
    pub async fn mark_seen(&self, device_id: &DeviceId) -> bool {
        let mut tables = self.tables.write().await;

        if tables.viewer_sets.contains_key(device_id) {
            return false;
        }

        tables.viewer_sets.insert(device_id.clone(), HashSet::new());
        true
    }

    /// Remove every reference to a session
    ///
    /// Idempotent: a second call for the same session returns an empty
    /// removal and leaves the registry unchanged.
    pub async fn remove_session(&self, session_id: SessionId) -> SessionRemoval {
        let mut tables = self.tables.write().await;
        tables.release(session_id)
    }

    /// Get the broadcaster session for a device
    pub async fn broadcaster_session(&self, device_id: &DeviceId) -> Option<SessionId> {
        self.tables
            .read()
            .await
            .broadcasters
            .get(device_id)
            .copied()
    }

    /// Devices with a live broadcaster, sorted
    pub async fn active_devices(&self) -> Vec<DeviceId> {
        self.tables.read().await.active_devices()
    }

    /// Devices with a viewer set (registered or seen via frames), sorted
    pub async fn seen_devices(&self) -> Vec<DeviceId> {
        let tables = self.tables.read().await;
        let mut devices: Vec<DeviceId> = tables.viewer_sets.keys().cloned().collect();
        devices.sort();
        devices
    }

    /// Viewer sessions watching a device, sorted
    pub async fn viewers_of(&self, device_id: &DeviceId) -> Vec<SessionId> {
        let tables = self.tables.read().await;
        let mut sessions: Vec<SessionId> = tables
            .viewer_sets
            .get(device_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        sessions.sort();
        sessions
    }

    /// Get the role a session currently holds
    pub async fn role(&self, session_id: SessionId) -> SessionRole {
        self.tables
            .read()
            .await
            .roles
            .get(&session_id)
            .cloned()
            .unwrap_or(SessionRole::Unassigned)
    }

    /// Whether any table still references the session
    pub async fn references_session(&self, session_id: SessionId) -> bool {
        let tables = self.tables.read().await;

        tables.roles.contains_key(&session_id)
            || tables.broadcasters.values().any(|s| *s == session_id)
            || tables.viewers.values().any(|e| e.session_id == session_id)
            || tables.viewer_sets.values().any(|set| set.contains(&session_id))
    }

    /// Get registry counts
    pub async fn stats(&self) -> RegistryStats {
        let tables = self.tables.read().await;

        RegistryStats {
            broadcasters: tables.broadcasters.len(),
            viewers: tables.viewers.len(),
            seen_devices: tables.viewer_sets.len(),
            watching: tables
                .viewers
                .values()
                .filter(|entry| entry.watching.is_some())
                .count(),
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev(id: &str) -> DeviceId {
        DeviceId::new(id)
    }

    #[tokio::test]
    async fn test_register_broadcaster() {
        let registry = ConnectionRegistry::new();

        let reg = registry.register_broadcaster(&dev("dev1"), SessionId(1)).await;
        assert!(reg.superseded.is_none());
        assert!(reg.released.is_noop());

        assert_eq!(registry.broadcaster_session(&dev("dev1")).await, Some(SessionId(1)));
        assert_eq!(registry.seen_devices().await, vec![dev("dev1")]);
        assert_eq!(
            registry.role(SessionId(1)).await,
            SessionRole::Broadcaster(dev("dev1"))
        );
    }

    #[tokio::test]
    async fn test_newest_broadcaster_supersedes() {
        let registry = ConnectionRegistry::new();

        registry.register_broadcaster(&dev("dev1"), SessionId(1)).await;
        let reg = registry.register_broadcaster(&dev("dev1"), SessionId(2)).await;
        assert_eq!(reg.superseded, Some(SessionId(1)));

        // Old session disconnecting must not remove the newer mapping
        let removal = registry.remove_session(SessionId(1)).await;
        assert!(removal.is_noop());
        assert_eq!(registry.broadcaster_session(&dev("dev1")).await, Some(SessionId(2)));
    }

    #[tokio::test]
    async fn test_register_viewer_returns_snapshot() {
        let registry = ConnectionRegistry::new();
        registry.register_broadcaster(&dev("b"), SessionId(1)).await;
        registry.register_broadcaster(&dev("a"), SessionId(2)).await;

        let reg = registry
            .register_viewer(&ViewerId::new("v1"), SessionId(3))
            .await;
        assert_eq!(reg.available, vec![dev("a"), dev("b")]);
        assert!(reg.superseded.is_none());
    }

    #[tokio::test]
    async fn test_attach_viewer_unknown_device() {
        let registry = ConnectionRegistry::new();
        registry
            .register_viewer(&ViewerId::new("v1"), SessionId(3))
            .await;

        let result = registry.attach_viewer(SessionId(3), &dev("missing")).await;
        assert_eq!(
            result,
            Err(RegistryError::DeviceNotRegistered(dev("missing")))
        );
        assert!(registry.viewers_of(&dev("missing")).await.is_empty());
    }

    #[tokio::test]
    async fn test_attach_viewer_adds_to_viewer_set() {
        let registry = ConnectionRegistry::new();
        registry.register_broadcaster(&dev("dev1"), SessionId(1)).await;
        registry
            .register_viewer(&ViewerId::new("v1"), SessionId(2))
            .await;

        let attachment = registry.attach_viewer(SessionId(2), &dev("dev1")).await.unwrap();
        assert_eq!(attachment.broadcaster, SessionId(1));
        assert_eq!(attachment.viewer_id, ViewerId::new("v1"));
        assert_eq!(registry.viewers_of(&dev("dev1")).await, vec![SessionId(2)]);
    }

    #[tokio::test]
    async fn test_attach_without_registration_is_implicit() {
        let registry = ConnectionRegistry::new();
        registry.register_broadcaster(&dev("dev1"), SessionId(1)).await;

        let attachment = registry.attach_viewer(SessionId(9), &dev("dev1")).await.unwrap();
        assert_eq!(attachment.viewer_id, ViewerId::implicit(SessionId(9)));
        assert_eq!(
            registry.role(SessionId(9)).await,
            SessionRole::Viewer(ViewerId::implicit(SessionId(9)))
        );
        assert_eq!(registry.stats().await.viewers, 1);
    }

    #[tokio::test]
    async fn test_viewer_switching_devices_leaves_old_set() {
        let registry = ConnectionRegistry::new();
        registry.register_broadcaster(&dev("a"), SessionId(1)).await;
        registry.register_broadcaster(&dev("b"), SessionId(2)).await;
        registry
            .register_viewer(&ViewerId::new("v"), SessionId(3))
            .await;

        registry.attach_viewer(SessionId(3), &dev("a")).await.unwrap();
        registry.attach_viewer(SessionId(3), &dev("b")).await.unwrap();

        assert!(registry.viewers_of(&dev("a")).await.is_empty());
        assert_eq!(registry.viewers_of(&dev("b")).await, vec![SessionId(3)]);
    }

    #[tokio::test]
    async fn test_viewer_set_tracks_disconnects() {
        let registry = ConnectionRegistry::new();
        registry.register_broadcaster(&dev("dev1"), SessionId(1)).await;

        for n in 10..15 {
            registry
                .register_viewer(&ViewerId::new(format!("v{}", n)), SessionId(n))
                .await;
            registry.attach_viewer(SessionId(n), &dev("dev1")).await.unwrap();
        }
        assert_eq!(registry.viewers_of(&dev("dev1")).await.len(), 5);

        registry.remove_session(SessionId(11)).await;
        registry.remove_session(SessionId(13)).await;

        assert_eq!(
            registry.viewers_of(&dev("dev1")).await,
            vec![SessionId(10), SessionId(12), SessionId(14)]
        );
    }

    #[tokio::test]
    async fn test_remove_broadcaster_session() {
        let registry = ConnectionRegistry::new();
        registry.register_broadcaster(&dev("dev1"), SessionId(1)).await;
        registry
            .register_viewer(&ViewerId::new("v1"), SessionId(2))
            .await;
        registry.attach_viewer(SessionId(2), &dev("dev1")).await.unwrap();

        let removal = registry.remove_session(SessionId(1)).await;
        assert_eq!(removal.released_devices, vec![dev("dev1")]);
        assert!(removal.departure.is_none());

        assert!(registry.active_devices().await.is_empty());
        assert!(!registry.references_session(SessionId(1)).await);
        // The viewer entry survives; its set went with the broadcaster
        assert!(registry.viewers_of(&dev("dev1")).await.is_empty());
        assert_eq!(registry.stats().await.viewers, 1);
    }

    #[tokio::test]
    async fn test_remove_viewer_session_reports_departure() {
        let registry = ConnectionRegistry::new();
        registry.register_broadcaster(&dev("dev1"), SessionId(1)).await;
        registry
            .register_viewer(&ViewerId::new("v1"), SessionId(2))
            .await;
        registry.attach_viewer(SessionId(2), &dev("dev1")).await.unwrap();

        let removal = registry.remove_session(SessionId(2)).await;
        assert_eq!(
            removal.departure,
            Some(ViewerDeparture {
                broadcaster: SessionId(1),
                device_id: dev("dev1"),
                viewer_session: SessionId(2),
            })
        );
        assert!(!registry.references_session(SessionId(2)).await);
        assert_eq!(registry.stats().await.viewers, 0);
    }

    #[tokio::test]
    async fn test_viewer_departure_without_live_broadcaster() {
        let registry = ConnectionRegistry::new();
        registry.register_broadcaster(&dev("dev1"), SessionId(1)).await;
        registry
            .register_viewer(&ViewerId::new("v1"), SessionId(2))
            .await;
        registry.attach_viewer(SessionId(2), &dev("dev1")).await.unwrap();
        registry.remove_session(SessionId(1)).await;

        let removal = registry.remove_session(SessionId(2)).await;
        assert_eq!(removal.role, SessionRole::Viewer(ViewerId::new("v1")));
        assert!(removal.departure.is_none());
    }

    #[tokio::test]
    async fn test_remove_session_is_idempotent() {
        let registry = ConnectionRegistry::new();
        registry.register_broadcaster(&dev("dev1"), SessionId(1)).await;

        let first = registry.remove_session(SessionId(1)).await;
        assert!(!first.is_noop());

        let before = registry.stats().await;
        let second = registry.remove_session(SessionId(1)).await;
        assert!(second.is_noop());
        assert_eq!(registry.stats().await, before);
    }

    #[tokio::test]
    async fn test_viewer_id_reregistered_from_new_session() {
        let registry = ConnectionRegistry::new();
        registry.register_broadcaster(&dev("dev1"), SessionId(1)).await;
        registry
            .register_viewer(&ViewerId::new("v1"), SessionId(2))
            .await;
        registry.attach_viewer(SessionId(2), &dev("dev1")).await.unwrap();

        let reg = registry
            .register_viewer(&ViewerId::new("v1"), SessionId(3))
            .await;
        assert_eq!(reg.superseded, Some(SessionId(2)));
        assert!(registry.viewers_of(&dev("dev1")).await.is_empty());
        assert_eq!(registry.role(SessionId(2)).await, SessionRole::Unassigned);
    }

    #[tokio::test]
    async fn test_role_switch_releases_broadcaster() {
        let registry = ConnectionRegistry::new();
        registry.register_broadcaster(&dev("dev1"), SessionId(1)).await;

        let reg = registry
            .register_viewer(&ViewerId::new("v1"), SessionId(1))
            .await;
        assert_eq!(reg.released.released_devices, vec![dev("dev1")]);
        assert!(reg.available.is_empty());
    }

    #[tokio::test]
    async fn test_mark_seen() {
        let registry = ConnectionRegistry::new();

        assert!(registry.mark_seen(&dev("cam")).await);
        assert!(!registry.mark_seen(&dev("cam")).await);
        assert_eq!(registry.seen_devices().await, vec![dev("cam")]);
        assert!(registry.active_devices().await.is_empty());
    }
}
