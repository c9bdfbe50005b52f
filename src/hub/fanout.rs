//! Frame, detection and presence fan-out
//!
//! Fan-out is global: every connected session receives every device's
//! updates, regardless of which device it requested.

use super::Hub;
use crate::protocol::{
    DetectionReport, FramePacket, ServerEvent, StreamingState, StreamingStatus,
};
use crate::registry::SessionId;
use crate::stats::HubStats;

impl Hub {
    /// Fan out a frame from a local broadcaster and offer it to peers
    pub async fn on_frame(&self, sender: SessionId, frame: FramePacket) {
        HubStats::bump(&self.stats.frames_received);

        if self.registry.mark_seen(&frame.device_id).await {
            tracing::info!(device = %frame.device_id, session_id = %sender, "New device seen");
        }

        if self.config.logs_frame(frame.frame_number) {
            tracing::info!(
                device = %frame.device_id,
                frame = frame.frame_number,
                width = ?frame.width,
                height = ?frame.height,
                "Frame received"
            );
        }

        let report = self
            .broadcast(ServerEvent::VideoFrameUpdate((&frame).into()), Some(sender))
            .await;

        let forwarded = self.federation.forward(&frame).await;

        tracing::trace!(
            device = %frame.device_id,
            frame = frame.frame_number,
            delivered = report.delivered,
            forwarded,
            "Frame fanned out"
        );
    }

    /// Fan out a frame received from a peer hub
    ///
    /// Nobody is excluded and the frame is not forwarded again.
    pub async fn relay_inbound_frame(&self, frame: FramePacket) {
        HubStats::bump(&self.stats.frames_federated_in);
        self.registry.mark_seen(&frame.device_id).await;

        let report = self
            .broadcast(ServerEvent::VideoFrameUpdate((&frame).into()), None)
            .await;

        tracing::debug!(
            device = %frame.device_id,
            frame = frame.frame_number,
            delivered = report.delivered,
            "Federated frame fanned out"
        );
    }

    /// Fan out a person-detection result to every session
    pub async fn on_detection(&self, sender: SessionId, report: DetectionReport) {
        HubStats::bump(&self.stats.detections);

        tracing::debug!(
            device = %report.device_id,
            persons = report.person_count,
            session_id = %sender,
            "Detection update"
        );

        self.broadcast(
            ServerEvent::DetectionUpdate {
                device_id: report.device_id,
                person_count: report.person_count,
                timestamp: report.timestamp,
                source: sender,
            },
            None,
        )
        .await;
    }

    /// Relay a soft presence update from a device
    ///
    /// `inactive` never removes registry mappings; only disconnect does.
    pub async fn on_device_streaming(&self, sender: SessionId, update: StreamingStatus) {
        if update.status == StreamingState::Active {
            self.registry.mark_seen(&update.device_id).await;
        }

        tracing::info!(
            device = %update.device_id,
            session_id = %sender,
            status = ?update.status,
            "Device streaming status"
        );

        self.broadcast(
            ServerEvent::DeviceStatus {
                device_id: update.device_id,
                status: update.status,
            },
            Some(sender),
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use serde_json::json;

    use super::super::test_support::{connect, drain, hub};
    use super::*;
    use crate::hub::{Hub, HubConfig};
    use crate::protocol::FrameUpdate;
    use crate::registry::DeviceId;

    fn dev(id: &str) -> DeviceId {
        DeviceId::new(id)
    }

    #[tokio::test]
    async fn test_frame_reaches_everyone_but_sender() {
        let hub = hub();
        let (b, mut rx_b) = connect(&hub).await;
        // Neither viewer requested the device
        let (_v1, mut rx_v1) = connect(&hub).await;
        let (_v2, mut rx_v2) = connect(&hub).await;

        let frame = FramePacket::new(dev("cam"), 7, 1000).dimensions(640, 480);
        hub.on_frame(b, frame.clone()).await;

        let expected = ServerEvent::VideoFrameUpdate(FrameUpdate::from(&frame));
        assert!(drain(&mut rx_b).is_empty());
        assert_eq!(drain(&mut rx_v1), vec![expected.clone()]);
        assert_eq!(drain(&mut rx_v2), vec![expected]);
        assert_eq!(hub.stats().frames_received.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_frame_with_iso_timestamp_is_fanned_out() {
        let hub = hub();
        let (b, _rx_b) = connect(&hub).await;
        let (_v, mut rx_v) = connect(&hub).await;

        hub.handle_text(
            b,
            r#"{"event":"video_frame","data":{"device_id":"cam","frame_number":3,
                "timestamp":"2025-01-01T00:00:00Z","width":640.0}}"#,
        )
        .await;

        let events = drain(&mut rx_v);
        let [ServerEvent::VideoFrameUpdate(update)] = events.as_slice() else {
            panic!("expected one frame update, got {:?}", events);
        };
        assert_eq!(update.timestamp, json!("2025-01-01T00:00:00Z"));
        assert_eq!(update.width, Some(json!(640.0)));
        assert_eq!(hub.stats().events_rejected.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_frame_marks_device_seen() {
        let hub = hub();
        let (b, _rx) = connect(&hub).await;

        hub.on_frame(b, FramePacket::new(dev("cam"), 1, 0)).await;

        assert_eq!(hub.registry().seen_devices().await, vec![dev("cam")]);
        // Seen is not registered
        assert!(hub.registry().active_devices().await.is_empty());
    }

    #[tokio::test]
    async fn test_inbound_frame_reaches_everyone() {
        let hub = hub();
        let (_a, mut rx_a) = connect(&hub).await;
        let (_b, mut rx_b) = connect(&hub).await;

        hub.relay_inbound_frame(FramePacket::new(dev("remote"), 4, 0))
            .await;

        assert_eq!(drain(&mut rx_a).len(), 1);
        assert_eq!(drain(&mut rx_b).len(), 1);
        assert_eq!(hub.stats().frames_federated_in.load(Ordering::Relaxed), 1);
        assert_eq!(hub.stats().frames_received.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_inbound_frame_not_forwarded() {
        let config = HubConfig::default().federation(
            crate::federation::FederationConfig::default().peer("http://127.0.0.1:1"),
        );
        let hub = Hub::new(config).unwrap();

        hub.relay_inbound_frame(FramePacket::new(dev("remote"), 4, 0))
            .await;

        assert_eq!(hub.federation().in_flight().await, 0);
        hub.shutdown().await;
    }

    #[tokio::test]
    async fn test_zero_person_detection_broadcast_to_all() {
        let hub = hub();
        let (b, mut rx_b) = connect(&hub).await;
        let (_v, mut rx_v) = connect(&hub).await;

        hub.on_detection(
            b,
            DetectionReport {
                device_id: dev("cam"),
                person_count: 0,
                timestamp: json!(42),
            },
        )
        .await;

        let expected = ServerEvent::DetectionUpdate {
            device_id: dev("cam"),
            person_count: 0,
            timestamp: json!(42),
            source: b,
        };
        assert_eq!(drain(&mut rx_b), vec![expected.clone()]);
        assert_eq!(drain(&mut rx_v), vec![expected]);
    }

    #[tokio::test]
    async fn test_inactive_status_keeps_registration() {
        let hub = hub();
        let (b, mut rx_b) = connect(&hub).await;
        let (_v, mut rx_v) = connect(&hub).await;
        hub.register_broadcaster(b, dev("cam")).await;
        drain(&mut rx_b);
        drain(&mut rx_v);

        hub.on_device_streaming(
            b,
            StreamingStatus {
                device_id: dev("cam"),
                status: StreamingState::Inactive,
            },
        )
        .await;

        assert!(drain(&mut rx_b).is_empty());
        assert_eq!(
            drain(&mut rx_v),
            vec![ServerEvent::DeviceStatus {
                device_id: dev("cam"),
                status: StreamingState::Inactive
            }]
        );
        assert_eq!(hub.registry().active_devices().await, vec![dev("cam")]);
    }

    #[tokio::test]
    async fn test_active_status_marks_seen() {
        let hub = hub();
        let (s, _rx) = connect(&hub).await;

        hub.on_device_streaming(
            s,
            StreamingStatus {
                device_id: dev("phone"),
                status: StreamingState::Active,
            },
        )
        .await;

        assert_eq!(hub.registry().seen_devices().await, vec![dev("phone")]);
    }

    #[tokio::test]
    async fn test_slow_session_drops_without_blocking_others() {
        let hub = Hub::new(HubConfig::default().session_queue_capacity(1)).unwrap();
        let (b, _rx_b) = connect(&hub).await;
        let (_slow, _rx_slow) = connect(&hub).await;
        let (_fast, mut rx_fast) = connect(&hub).await;

        for n in 0..3 {
            hub.on_frame(b, FramePacket::new(dev("cam"), n, 0)).await;
            assert_eq!(drain(&mut rx_fast).len(), 1);
        }

        assert_eq!(hub.stats().events_dropped.load(Ordering::Relaxed), 2);
    }
}
