//! Registration and negotiation handlers

use super::Hub;
use crate::protocol::{ServerEvent, SignalingMessage};
use crate::registry::{DeviceId, RegistryError, SessionId, ViewerId};
use crate::session::Delivery;
use crate::stats::HubStats;

impl Hub {
    /// Register a session as the broadcaster for a device
    ///
    /// Every connected session, the registrant included, learns about the
    /// device through `broadcaster-available`.
    pub async fn register_broadcaster(&self, session_id: SessionId, device_id: DeviceId) {
        let registration = self
            .registry
            .register_broadcaster(&device_id, session_id)
            .await;

        self.announce_removal(&registration.released).await;

        self.broadcast(ServerEvent::BroadcasterAvailable { device_id }, None)
            .await;
    }

    /// Register a session as a viewer and reply with the broadcaster list
    pub async fn register_viewer(&self, session_id: SessionId, viewer_id: ViewerId) {
        let registration = self.registry.register_viewer(&viewer_id, session_id).await;

        self.announce_removal(&registration.released).await;

        if let Some(previous) = registration.superseded {
            tracing::info!(
                viewer = %viewer_id,
                previous_session = %previous,
                session_id = %session_id,
                "Viewer superseded"
            );
        }

        self.emit(
            session_id,
            ServerEvent::AvailableBroadcasters(registration.available),
        )
        .await;
    }

    /// Reply with the current broadcaster list
    pub async fn send_broadcaster_list(&self, session_id: SessionId) {
        let devices = self.registry.active_devices().await;
        self.emit(session_id, ServerEvent::AvailableBroadcasters(devices))
            .await;
    }

    /// Attach a viewer session to a device and notify its broadcaster
    ///
    /// An unknown device is reported to the requester as an `error` event
    /// and also returned so callers can observe it.
    pub async fn request_stream(
        &self,
        session_id: SessionId,
        device_id: DeviceId,
    ) -> Result<(), RegistryError> {
        let attachment = match self.registry.attach_viewer(session_id, &device_id).await {
            Ok(attachment) => attachment,
            Err(e) => {
                tracing::debug!(session_id = %session_id, device = %device_id, "Stream request refused");
                self.emit(session_id, ServerEvent::error(e.to_string())).await;
                return Err(e);
            }
        };

        self.announce_removal(&attachment.released).await;

        let delivery = self
            .emit(
                attachment.broadcaster,
                ServerEvent::ViewerJoined {
                    viewer_id: session_id,
                },
            )
            .await;

        tracing::debug!(
            session_id = %session_id,
            viewer = %attachment.viewer_id,
            device = %device_id,
            broadcaster = %attachment.broadcaster,
            delivered = delivery == Delivery::Sent,
            "Viewer joined"
        );

        Ok(())
    }

    /// Forward an offer, answer or ICE candidate to its target session
    ///
    /// The payload is passed through untouched. A target that is not
    /// connected is reported to the sender as an `error` event.
    pub async fn relay(&self, message: SignalingMessage) -> Result<(), RegistryError> {
        let kind = message.kind;
        let sender = message.sender;
        let target = message.target;

        match self.emit(target, message.into_event()).await {
            Delivery::NotConnected => {
                let err = RegistryError::SessionNotConnected(target);
                tracing::debug!(kind = %kind, sender = %sender, target = %target, "Relay target missing");
                self.emit(sender, ServerEvent::error(err.to_string())).await;
                Err(err)
            }
            delivery => {
                HubStats::bump(&self.stats.signals_relayed);
                tracing::debug!(
                    kind = %kind,
                    sender = %sender,
                    target = %target,
                    dropped = delivery == Delivery::QueueFull,
                    "Signal relayed"
                );
                Ok(())
            }
        }
    }
}
