//! Federation configuration

use std::time::Duration;

use crate::error::{Error, Result};

/// Peer hub federation options
#[derive(Debug, Clone)]
pub struct FederationConfig {
    /// Base URLs of peer hubs (e.g. `http://10.0.0.2:8080`)
    pub peers: Vec<String>,

    /// Per-request timeout for relay POSTs
    pub request_timeout: Duration,

    /// Forward frames whose number is a multiple of this (0 or 1 = every frame)
    pub sample_interval: u64,

    /// Maximum relay POSTs outstanding at once
    pub max_in_flight: usize,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            peers: Vec::new(),
            request_timeout: Duration::from_secs(1),
            sample_interval: 2,
            max_in_flight: 64,
        }
    }
}

impl FederationConfig {
    /// Add a peer hub
    pub fn peer(mut self, base_url: impl Into<String>) -> Self {
        self.peers.push(base_url.into());
        self
    }

    /// Replace the peer list
    pub fn peers<I, S>(mut self, peers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.peers = peers.into_iter().map(Into::into).collect();
        self
    }

    /// Set the per-request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the frame sampling interval
    pub fn sample_interval(mut self, interval: u64) -> Self {
        self.sample_interval = interval;
        self
    }

    /// Set the in-flight request bound
    pub fn max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = max.max(1);
        self
    }

    /// Check every peer is an absolute http(s) base URL
    pub fn validate(&self) -> Result<()> {
        for peer in &self.peers {
            let valid = match reqwest::Url::parse(peer) {
                Ok(url) => {
                    matches!(url.scheme(), "http" | "https")
                        && url.host_str().is_some_and(|host| !host.is_empty())
                }
                Err(_) => false,
            };
            if !valid {
                return Err(Error::Config(format!("peer is not an http(s) URL: {}", peer)));
            }
        }
        Ok(())
    }

    /// Whether a frame number is selected for forwarding
    pub fn samples(&self, frame_number: u64) -> bool {
        self.sample_interval <= 1 || frame_number % self.sample_interval == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FederationConfig::default();

        assert!(config.peers.is_empty());
        assert_eq!(config.request_timeout, Duration::from_secs(1));
        assert_eq!(config.sample_interval, 2);
        assert_eq!(config.max_in_flight, 64);
    }

    #[test]
    fn test_even_frames_sampled() {
        let config = FederationConfig::default();

        assert!(config.samples(0));
        assert!(config.samples(4));
        assert!(!config.samples(5));
    }

    #[test]
    fn test_interval_one_samples_everything() {
        let config = FederationConfig::default().sample_interval(1);
        assert!(config.samples(7));

        let config = FederationConfig::default().sample_interval(0);
        assert!(config.samples(7));
    }

    #[test]
    fn test_validate_peers() {
        assert!(FederationConfig::default().peer("https://hub-b").validate().is_ok());

        let err = FederationConfig::default()
            .peer("hub-b:8080")
            .validate()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: peer is not an http(s) URL: hub-b:8080"
        );
    }

    #[test]
    fn test_validate_rejects_hostless_and_other_schemes() {
        for peer in ["http://", "https://", "ftp://hub-b", "not a url"] {
            assert!(
                FederationConfig::default().peer(peer).validate().is_err(),
                "{} should be rejected",
                peer
            );
        }
        assert!(FederationConfig::default()
            .peer("http://10.0.0.2:8080")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_builder_chaining() {
        let config = FederationConfig::default()
            .peer("http://a:8080")
            .peer("http://b:8080")
            .request_timeout(Duration::from_millis(250))
            .max_in_flight(0);

        assert_eq!(config.peers.len(), 2);
        assert_eq!(config.request_timeout, Duration::from_millis(250));
        assert_eq!(config.max_in_flight, 1);
    }
}
