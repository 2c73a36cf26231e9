//! Error types for the recommender tracking system
//!
//! This module provides comprehensive error handling using thiserror for
//! structured error definitions and anyhow for error propagation.
//!
//! Metric functions never return errors: insufficient data is reported as
//! `f64::NAN`. Everything in here is either a configuration problem, a
//! lookup of something that was never registered, a failure of the wrapped
//! recommender, or a malformed log file.

use thiserror::Error;

/// Main error type for tracking and evaluation operations
#[derive(Error, Debug)]
pub enum RecsysError {
    /// `register_user` was called before an assignment function was set
    #[error("Configuration error: no function assigning users to trackers was provided")]
    MissingAssigner,

    /// Implicit feedback is logged but no aggregation function is configured
    #[error("Configuration error: tracker contains implicit feedback but no aggregator was provided")]
    MissingAggregator,

    /// Tuning parameter name not known to the recommender
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    /// Tuning parameter known, value rejected
    #[error("Invalid value for parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Configuration values failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// TOML configuration could not be parsed
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Recommender system not registered
    #[error("Recommender system not found: {0}")]
    SystemNotFound(String),

    /// Tracker not registered
    #[error("Tracker not found: {0}")]
    TrackerNotFound(String),

    /// Resource already exists
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// The wrapped recommender failed
    #[error("Recommender error: {0}")]
    Recommender(String),

    /// Log file content does not follow the text format
    #[error("Malformed log at line {line}: {message}")]
    LogFormat { line: usize, message: String },

    /// Invalid operation (e.g., writing a multi-line field to a text log)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Log header names a different tracker
    #[error("Recommender name doesn't match first line of file: expected {expected}, found {found}")]
    NameMismatch { expected: String, found: String },

    /// Timestamp could not be parsed
    #[error("Invalid timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl RecsysError {
    /// Whether the error stems from missing or invalid configuration
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RecsysError::MissingAssigner
                | RecsysError::MissingAggregator
                | RecsysError::UnknownParameter(_)
                | RecsysError::InvalidParameter { .. }
                | RecsysError::InvalidConfig(_)
                | RecsysError::Config(_)
                | RecsysError::ConfigParse(_)
        )
    }

    /// Whether the error is a lookup of an unregistered identity
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RecsysError::SystemNotFound(_) | RecsysError::TrackerNotFound(_)
        )
    }
}

/// Result type alias for tracking operations
pub type Result<T> = std::result::Result<T, RecsysError>;

/// Convert anyhow::Error to RecsysError
impl From<anyhow::Error> for RecsysError {
    fn from(err: anyhow::Error) -> Self {
        RecsysError::Other(err.to_string())
    }
}
