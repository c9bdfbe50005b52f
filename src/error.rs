//! Error types for the relay hub
//!
//! Errors raised while handling a single event never escape that event's
//! handler. Only startup failures (binding the listener, building the
//! federation client) reach the caller of [`HubServer::run`].
//!
//! [`HubServer::run`]: crate::server::HubServer::run

use std::fmt;

use crate::federation::FederationError;
use crate::registry::RegistryError;

/// Result alias used by fallible hub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Socket or listener I/O failure
    Io(std::io::Error),
    /// Malformed inbound event
    Protocol(ProtocolError),
    /// Target device or session not registered
    Routing(RegistryError),
    /// Peer hub unreachable
    Transport(FederationError),
    /// HTTP client could not be constructed
    Http(reqwest::Error),
    /// Invalid configuration value
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Protocol(e) => write!(f, "Protocol error: {}", e),
            Error::Routing(e) => write!(f, "Routing error: {}", e),
            Error::Transport(e) => write!(f, "Transport error: {}", e),
            Error::Http(e) => write!(f, "HTTP client error: {}", e),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Protocol(e) => Some(e),
            Error::Routing(e) => Some(e),
            Error::Transport(e) => Some(e),
            Error::Http(e) => Some(e),
            Error::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Error::Routing(e)
    }
}

impl From<FederationError> for Error {
    fn from(e: FederationError) -> Self {
        Error::Transport(e)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

/// Malformed or unsupported inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Payload was not valid JSON or did not match any known event
    Malformed(String),
    /// A required identifier was missing or empty
    MissingField(&'static str),
    /// Binary frames carry no events
    BinaryFrame,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Malformed(msg) => write!(f, "Malformed event: {}", msg),
            ProtocolError::MissingField(field) => write!(f, "Missing required field: {}", field),
            ProtocolError::BinaryFrame => write!(f, "Binary frames are not supported"),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        ProtocolError::Malformed(e.to_string())
    }
}
