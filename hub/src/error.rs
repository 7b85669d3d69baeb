use thiserror::Error;

/// Broadcast hub errors
#[derive(Error, Debug)]
pub enum HubError {
    /// Inbound payload failed boundary validation
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Session is not registered with the hub
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Data source failure during a poll cycle
    #[error("Source error: {0}")]
    Source(#[from] sc_analysis::SourceError),

    /// Every ticker in a poll cycle failed
    #[error("Poll cycle failed: all {0} tickers failed")]
    CycleFailed(usize),

    /// Transport failure on a subscriber connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Reconnect budget exhausted
    #[error("Disconnected after {attempts} reconnect attempts")]
    Disconnected {
        attempts: u32,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        HubError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for HubError {
    fn from(err: serde_yaml::Error) -> Self {
        HubError::ConfigError(err.to_string())
    }
}

/// Result type for hub operations
pub type Result<T> = std::result::Result<T, HubError>;
