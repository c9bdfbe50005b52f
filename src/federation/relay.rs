//! Outbound frame relay to peer hubs
//!
//! Sampled frames are POSTed to every peer as detached tasks. Dispatch is
//! fire-and-forget: no retry, no ordering across frames or peers. Tasks
//! live in a bounded `JoinSet` so shutdown can abort them.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

use super::config::FederationConfig;
use super::error::FederationError;
use super::RELAY_PATH;
use crate::error::Result;
use crate::protocol::FramePacket;
use crate::stats::HubStats;

/// Relay of sampled frames to peer hubs
pub struct FederationRelay {
    client: reqwest::Client,
    endpoints: Vec<String>,
    config: FederationConfig,
    in_flight: Arc<Semaphore>,
    tasks: Mutex<JoinSet<()>>,
    stats: Arc<HubStats>,
}

impl FederationRelay {
    /// Build the relay and its HTTP client
    pub fn new(config: FederationConfig, stats: Arc<HubStats>) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let endpoints = config
            .peers
            .iter()
            .map(|peer| relay_endpoint(peer))
            .collect();

        Ok(Self {
            client,
            endpoints,
            in_flight: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
            config,
            tasks: Mutex::new(JoinSet::new()),
            stats,
        })
    }

    /// Get the federation configuration
    pub fn config(&self) -> &FederationConfig {
        &self.config
    }

    /// Number of configured peers
    pub fn peer_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether a frame with this number would be forwarded
    pub fn should_forward(&self, frame_number: u64) -> bool {
        !self.endpoints.is_empty() && self.config.samples(frame_number)
    }

    /// Forward a frame to every peer if it is sampled
    ///
    /// Returns the number of POSTs dispatched. Never waits for completion.
    pub async fn forward(&self, frame: &FramePacket) -> usize {
        if !self.should_forward(frame.frame_number) {
            return 0;
        }

        let body = match serde_json::to_vec(frame) {
            Ok(body) => Bytes::from(body),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize frame for relay");
                return 0;
            }
        };

        let mut tasks = self.tasks.lock().await;

        // Reap finished relays so the set only holds live work
        while tasks.try_join_next().is_some() {}

        let mut dispatched = 0;
        for endpoint in &self.endpoints {
            let permit = match Arc::clone(&self.in_flight).try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    HubStats::bump(&self.stats.federation_skipped);
                    tracing::debug!(peer = %endpoint, "Relay skipped: too many in flight");
                    continue;
                }
            };

            let client = self.client.clone();
            let url = endpoint.clone();
            let body = body.clone();
            let stats = Arc::clone(&self.stats);
            let device = frame.device_id.clone();
            let frame_number = frame.frame_number;

            tasks.spawn(async move {
                let _permit = permit;

                match post_frame(&client, &url, body).await {
                    Ok(()) => HubStats::bump(&stats.federation_sent),
                    Err(e) => {
                        HubStats::bump(&stats.federation_failed);
                        tracing::debug!(
                            peer = %url,
                            device = %device,
                            frame = frame_number,
                            timeout = e.is_timeout(),
                            error = %e,
                            "Relay to peer failed"
                        );
                    }
                }
            });
            dispatched += 1;
        }

        dispatched
    }

    /// Relays still running
    pub async fn in_flight(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Abort every outstanding relay and wait for the tasks to finish
    pub async fn shutdown(&self) {
        let mut tasks = self.tasks.lock().await;
        let pending = tasks.len();
        tasks.shutdown().await;

        if pending > 0 {
            tracing::info!(aborted = pending, "Federation relays cancelled");
        }
    }
}

/// Full relay URL for a peer base URL
pub fn relay_endpoint(peer: &str) -> String {
    format!("{}{}", peer.trim_end_matches('/'), RELAY_PATH)
}

async fn post_frame(
    client: &reqwest::Client,
    url: &str,
    body: Bytes,
) -> std::result::Result<(), FederationError> {
    let response = client
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FederationError::Status(status));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;
    use crate::registry::DeviceId;

    fn relay(config: FederationConfig) -> FederationRelay {
        FederationRelay::new(config, Arc::new(HubStats::new())).unwrap()
    }

    #[test]
    fn test_relay_endpoint() {
        assert_eq!(
            relay_endpoint("http://peer:8080/"),
            "http://peer:8080/api/relay/video_frame"
        );
        assert_eq!(
            relay_endpoint("http://peer:8080"),
            "http://peer:8080/api/relay/video_frame"
        );
    }

    #[tokio::test]
    async fn test_no_peers_never_forwards() {
        let relay = relay(FederationConfig::default());
        let frame = FramePacket::new(DeviceId::new("cam"), 4, 0);

        assert!(!relay.should_forward(4));
        assert_eq!(relay.forward(&frame).await, 0);
    }

    #[tokio::test]
    async fn test_odd_frames_not_forwarded() {
        let relay = relay(FederationConfig::default().peer("http://127.0.0.1:9"));
        let frame = FramePacket::new(DeviceId::new("cam"), 5, 0);

        assert_eq!(relay.forward(&frame).await, 0);
        assert_eq!(relay.in_flight().await, 0);
    }

    #[tokio::test]
    async fn test_unreachable_peer_failure_is_swallowed() {
        let stats = Arc::new(HubStats::new());
        let config = FederationConfig::default()
            .peer("http://127.0.0.1:1")
            .request_timeout(Duration::from_millis(200));
        let relay = FederationRelay::new(config, Arc::clone(&stats)).unwrap();

        let frame = FramePacket::new(DeviceId::new("cam"), 2, 0);
        assert_eq!(relay.forward(&frame).await, 1);

        let failed = tokio::time::timeout(Duration::from_secs(2), async {
            while stats.federation_failed.load(Ordering::Relaxed) == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(failed.is_ok());
        assert_eq!(stats.federation_sent.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_in_flight_bound_skips_excess() {
        let stats = Arc::new(HubStats::new());
        // A listener that never answers keeps the first request pending
        let silent = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = silent.local_addr().unwrap();
        let config = FederationConfig::default()
            .peer(format!("http://{}", addr))
            .request_timeout(Duration::from_secs(30))
            .max_in_flight(1);
        let relay = FederationRelay::new(config, Arc::clone(&stats)).unwrap();

        assert_eq!(relay.forward(&FramePacket::new(DeviceId::new("cam"), 2, 0)).await, 1);
        assert_eq!(relay.forward(&FramePacket::new(DeviceId::new("cam"), 4, 0)).await, 0);
        assert_eq!(stats.federation_skipped.load(Ordering::Relaxed), 1);

        relay.shutdown().await;
        assert_eq!(relay.in_flight().await, 0);
    }
}
