//! Hub configuration

use crate::federation::FederationConfig;

/// Hub behaviour options
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Outbound events buffered per session before drops start
    pub session_queue_capacity: usize,

    /// Log an info line every N frame numbers (0 = never)
    pub frame_log_interval: u64,

    /// Peer hub federation
    pub federation: FederationConfig,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            session_queue_capacity: 256,
            frame_log_interval: 30,
            federation: FederationConfig::default(),
        }
    }
}

impl HubConfig {
    /// Set the per-session queue capacity
    pub fn session_queue_capacity(mut self, capacity: usize) -> Self {
        self.session_queue_capacity = capacity.max(1);
        self
    }

    /// Set the frame log interval
    pub fn frame_log_interval(mut self, interval: u64) -> Self {
        self.frame_log_interval = interval;
        self
    }

    /// Set the federation options
    pub fn federation(mut self, federation: FederationConfig) -> Self {
        self.federation = federation;
        self
    }

    /// Whether a frame number falls on the log interval
    pub fn logs_frame(&self, frame_number: u64) -> bool {
        self.frame_log_interval > 0 && frame_number % self.frame_log_interval == 0
    }
}
