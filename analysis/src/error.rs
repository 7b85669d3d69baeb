//! Error types for the analysis engine

use thiserror::Error;

/// Failure reported by a market data source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Transport-level failure (connection, timeout, HTTP status)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The source answered but the payload could not be understood
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The source does not know the instrument
    #[error("Unknown ticker: {0}")]
    UnknownTicker(String),
}

/// Main error type for analysis operations
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The source returned an empty series
    #[error("No data available for {ticker}")]
    NoData {
        ticker: String,
    },

    /// Too few bars for the requested lookback
    #[error("Insufficient data points: need at least {required}, got {available}")]
    InsufficientData {
        required: usize,
        available: usize,
    },

    /// Data source failure
    #[error("Upstream fetch failed: {0}")]
    UpstreamFetch(#[from] SourceError),

    /// Request rejected at the boundary
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Source data violates series invariants
    #[error("Invalid price series: {0}")]
    InvalidSeries(String),

    /// Model fitting failed
    #[error("Model error: {0}")]
    ModelError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Result type for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;
