//! Error types for InsightGrid.
//!
//! All errors are strongly typed using thiserror so callers can pattern
//! match on specific conditions. Every error is scoped to a single request;
//! nothing here is fatal to the process.

use thiserror::Error;

use crate::provider::ProviderError;

/// Validation errors raised while parsing a request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Field '{field}' value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Field '{field}' has an invalid value: {reason}")]
    InvalidValue {
        field: String,
        reason: String,
    },

    #[error("Unknown scenario type '{value}' in field 'type'")]
    UnknownScenario {
        value: String,
    },

    #[error("Unknown query type '{value}' in field 'type'")]
    UnknownQuery {
        value: String,
    },
}

impl ValidationError {
    /// Creates a missing-field error.
    #[must_use]
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates an invalid-value error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending request field.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::MissingField { field }
            | Self::OutOfRange { field, .. }
            | Self::InvalidValue { field, .. } => field,
            Self::UnknownScenario { .. } | Self::UnknownQuery { .. } => "type",
        }
    }
}

/// Execution errors raised while serving a validated request.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Aggregate data provider unavailable: {message}")]
    UpstreamUnavailable {
        message: String,
    },

    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    #[error("Worker queue is full (capacity: {capacity})")]
    QueueFull {
        capacity: usize,
    },

    #[error("Worker pool disconnected")]
    Disconnected,

    #[error("Snapshot kind '{actual}' does not match scenario '{scenario}'")]
    SnapshotMismatch {
        scenario: String,
        actual: String,
    },
}

impl From<ProviderError> for ExecutionError {
    fn from(err: ProviderError) -> Self {
        Self::UpstreamUnavailable {
            message: err.to_string(),
        }
    }
}

/// Configuration errors raised at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue {
        key: String,
        reason: String,
    },

    #[error("Failed to read dataset '{path}': {reason}")]
    Dataset {
        path: String,
        reason: String,
    },
}

/// Top-level error type for InsightGrid.
#[derive(Debug, Error)]
pub enum InsightError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl From<ProviderError> for InsightError {
    fn from(err: ProviderError) -> Self {
        Self::Execution(err.into())
    }
}

impl InsightError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if this error is transient and the request may be retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Config(_) | Self::Internal { .. } => false,
            Self::Execution(e) => matches!(
                e,
                ExecutionError::UpstreamUnavailable { .. }
                    | ExecutionError::Timeout { .. }
                    | ExecutionError::QueueFull { .. }
            ),
        }
    }

    /// Offending request field, for validation errors.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation(v) => Some(v.field()),
            _ => None,
        }
    }
}

/// Result type alias for InsightGrid operations.
pub type InsightResult<T> = Result<T, InsightError>;
