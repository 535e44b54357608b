//! Error types for herald.

use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
///
/// Variants are grouped by how the job substrate treats them. Transient I/O
/// errors are retried per the job's own policy. Everything else aborts the
/// job, rate limits included.
#[derive(Debug, Error)]
pub enum AppError {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Duplicate channel name on {platform}: {name}")]
    DuplicateChannel { platform: String, name: String },

    #[error("Destination not found: {0}")]
    DestinationNotFound(String),

    // === Transient I/O Errors ===
    #[error("Data source error: {0}")]
    DataSource(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Queue error: {0}")]
    Queue(String),

    // === Rate Limiting ===
    #[error("Rate limited by {0}")]
    RateLimited(String),

    // === Assertion Failures ===
    #[error("Invariant violated: {0}")]
    Invariant(String),

    // === Other ===
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the error code used in logs.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::DuplicateChannel { .. } => "DUPLICATE_CHANNEL",
            Self::DestinationNotFound(_) => "DESTINATION_NOT_FOUND",
            Self::DataSource(_) => "DATA_SOURCE_ERROR",
            Self::Delivery(_) => "DELIVERY_ERROR",
            Self::Queue(_) => "QUEUE_ERROR",
            Self::RateLimited(_) => "RATE_LIMITED",
            Self::Invariant(_) => "INVARIANT_VIOLATED",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether the job that produced this error may be attempted again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::DataSource(_) | Self::Delivery(_) | Self::Queue(_) | Self::Internal(_) => true,
            Self::Config(_)
            | Self::DuplicateChannel { .. }
            | Self::DestinationNotFound(_)
            | Self::RateLimited(_)
            | Self::Invariant(_)
            | Self::Serialization(_) => false,
        }
    }
}

// === From implementations ===

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(AppError::DataSource("timeout".into()).is_retryable());
        assert!(AppError::Delivery("502".into()).is_retryable());
        assert!(AppError::Queue("connection reset".into()).is_retryable());

        assert!(!AppError::RateLimited("telegram".into()).is_retryable());
        assert!(!AppError::DestinationNotFound("discord:alerts".into()).is_retryable());
        assert!(!AppError::Invariant("cursor went backwards".into()).is_retryable());
        assert!(
            !AppError::DuplicateChannel {
                platform: "discord".into(),
                name: "alerts".into(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::RateLimited("x".into()).error_code(), "RATE_LIMITED");
        assert_eq!(
            AppError::DestinationNotFound("x".into()).error_code(),
            "DESTINATION_NOT_FOUND"
        );
    }
}
