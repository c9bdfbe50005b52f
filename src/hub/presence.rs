//! Disconnect cleanup and presence notifications

use super::Hub;
use crate::protocol::ServerEvent;
use crate::registry::{SessionId, SessionRemoval};

impl Hub {
    /// Tear down a session after its transport closed
    ///
    /// Safe to call more than once; later calls find nothing to clean.
    pub async fn disconnect(&self, session_id: SessionId) -> SessionRemoval {
        let was_open = self.sessions.close(session_id).await;
        let removal = self.registry.remove_session(session_id).await;

        if removal.is_noop() {
            tracing::debug!(
                session_id = %session_id,
                was_open,
                role = removal.role.as_str(),
                "Disconnect with nothing to announce"
            );
        } else {
            tracing::info!(
                session_id = %session_id,
                role = removal.role.as_str(),
                released = removal.released_devices.len(),
                "Session removed"
            );
        }

        self.announce_removal(&removal).await;
        removal
    }

    /// Tell the remaining sessions what a removal released
    pub(crate) async fn announce_removal(&self, removal: &SessionRemoval) {
        for device_id in &removal.released_devices {
            tracing::info!(device = %device_id, session_id = %removal.session_id, "Broadcaster gone");
            self.broadcast(
                ServerEvent::BroadcasterDisconnected {
                    device_id: device_id.clone(),
                },
                None,
            )
            .await;
        }

        if let Some(departure) = &removal.departure {
            tracing::debug!(
                device = %departure.device_id,
                viewer_session = %departure.viewer_session,
                broadcaster = %departure.broadcaster,
                "Viewer left"
            );
            self.emit(
                departure.broadcaster,
                ServerEvent::ViewerDisconnected {
                    viewer_id: departure.viewer_session,
                },
            )
            .await;
        }
    }
}
