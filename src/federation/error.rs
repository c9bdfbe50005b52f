//! Federation error types

/// Failure delivering a frame to a peer hub
#[derive(Debug)]
pub enum FederationError {
    /// Connection failure or timeout
    Request(reqwest::Error),
    /// Peer answered with a non-success status
    Status(reqwest::StatusCode),
}

impl FederationError {
    /// Whether the request hit its timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, FederationError::Request(e) if e.is_timeout())
    }
}

impl std::fmt::Display for FederationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FederationError::Request(e) => write!(f, "Relay request failed: {}", e),
            FederationError::Status(status) => write!(f, "Peer rejected relay: {}", status),
        }
    }
}

impl std::error::Error for FederationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FederationError::Request(e) => Some(e),
            FederationError::Status(_) => None,
        }
    }
}

impl From<reqwest::Error> for FederationError {
    fn from(e: reqwest::Error) -> Self {
        FederationError::Request(e)
    }
}
