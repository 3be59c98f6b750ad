//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid socket address: {0}")]
    InvalidSocketAddr(String),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Reconnect backoff initial delay exceeds maximum")]
    InvalidBackoff,

    #[error("Result expiry must be positive")]
    InvalidResultExpiry,

    #[error("Worker concurrency must be between 1 and 64")]
    InvalidConcurrency,

    #[error("Worker queue list is empty")]
    NoQueuesConfigured,

    #[error("Default queue '{0}' is not in the worker queue list")]
    DefaultQueueNotListed(String),

    #[error("Unsupported JWT algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Token expiry must be positive")]
    InvalidTokenExpiry,

    #[error("Channel capacity must be positive")]
    InvalidCapacity,
}
