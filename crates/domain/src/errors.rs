//! Error types used throughout the exporter

use thiserror::Error;

/// Main error type for Couchstat
#[derive(Error, Debug)]
pub enum CouchstatError {
    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network-level failure talking to the monitored cluster
    #[error("Network error: {0}")]
    Network(String),

    /// The cluster answered with an unexpected status code
    #[error("Expected status code {expected}, got {actual} for {path}")]
    UnexpectedStatus {
        /// Status code the caller required
        expected: u16,
        /// Status code the cluster returned
        actual: u16,
        /// Request path, for log context
        path: String,
    },

    /// Metric registration or rendering failure
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// A referenced entity was not reported by the cluster
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Catch-all for internal invariant violations
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Couchstat operations
pub type Result<T> = std::result::Result<T, CouchstatError>;
