//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Beacon
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum BeaconError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not connected: {0}")]
    NotConnected(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BeaconError {
    /// Whether this error represents an authorization failure that a token
    /// refresh may recover from (HTTP 401 or a vendor "unauthorized" code).
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

/// Result type alias for Beacon operations
pub type Result<T> = std::result::Result<T, BeaconError>;
