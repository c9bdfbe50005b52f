//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::federation::FederationConfig;
use crate::hub::HubConfig;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent event-channel connections (0 = unlimited)
    pub max_connections: usize,

    /// Hub behaviour, including federation
    pub hub: HubConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 0, // Unlimited
            hub: HubConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the per-session outbound queue capacity
    pub fn session_queue_capacity(mut self, capacity: usize) -> Self {
        self.hub = self.hub.session_queue_capacity(capacity);
        self
    }

    /// Add a federation peer
    pub fn peer(mut self, url: impl Into<String>) -> Self {
        self.hub.federation = self.hub.federation.peer(url);
        self
    }

    /// Set the federation request timeout
    pub fn federation_timeout(mut self, timeout: Duration) -> Self {
        self.hub.federation = self.hub.federation.request_timeout(timeout);
        self
    }

    /// Replace the federation options
    pub fn federation(mut self, federation: FederationConfig) -> Self {
        self.hub = self.hub.federation(federation);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 8080);
        assert!(config.bind_addr.ip().is_unspecified());
        assert_eq!(config.max_connections, 0);
        assert_eq!(config.hub.session_queue_capacity, 256);
        assert_eq!(config.hub.federation.request_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 9090);
    }

    #[test]
    fn test_builder_bind() {
        let addr: SocketAddr = "0.0.0.0:3000".parse().unwrap();
        let config = ServerConfig::default().bind(addr);

        assert_eq!(config.bind_addr, addr);
    }

    #[test]
    fn test_builder_max_connections() {
        let config = ServerConfig::default().max_connections(100);
        assert_eq!(config.max_connections, 100);
    }

    #[test]
    fn test_builder_federation() {
        let config = ServerConfig::default()
            .peer("http://hub-b:8080")
            .peer("http://hub-c:8080")
            .federation_timeout(Duration::from_millis(250));

        assert_eq!(
            config.hub.federation.peers,
            vec!["http://hub-b:8080".to_string(), "http://hub-c:8080".to_string()]
        );
        assert_eq!(
            config.hub.federation.request_timeout,
            Duration::from_millis(250)
        );
    }

    #[test]
    fn test_builder_chain() {
        let addr: SocketAddr = "127.0.0.1:8081".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .max_connections(50)
            .session_queue_capacity(16);

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.hub.session_queue_capacity, 16);
    }
}
