//! Error types for the Intervox engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// External collaborators the engine calls out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceKind {
    /// Language-model backed evaluation/classification/generation.
    Reasoning,
    /// Speech-to-text and text-to-speech conversion.
    Speech,
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceKind::Reasoning => write!(f, "reasoning"),
            ServiceKind::Speech => write!(f, "speech"),
        }
    }
}

/// A shared error type for the entire Intervox engine.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum InterviewError {
    /// An external service (Speech or Reasoning) timed out or failed
    #[error("{service} service failure: {message}")]
    ServiceFailure {
        service: ServiceKind,
        message: String,
        /// Whether the caller may reasonably try the call again
        retryable: bool,
    },

    /// No bank question matched the current filter and generation failed
    #[error("question selection exhausted: no bank match and generation failed")]
    SelectionExhausted,

    /// Operation referenced an unknown or already-ended session
    #[error("unknown or ended session: '{id}'")]
    InvalidSession { id: String },

    /// Inbound message failed structural validation
    #[error("malformed inbound message: {0}")]
    MalformedMessage(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl InterviewError {
    /// Creates a ServiceFailure error
    pub fn service_failure(
        service: ServiceKind,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self::ServiceFailure {
            service,
            message: message.into(),
            retryable,
        }
    }

    /// Creates an InvalidSession error
    pub fn invalid_session(id: impl Into<String>) -> Self {
        Self::InvalidSession { id: id.into() }
    }

    /// Creates a MalformedMessage error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedMessage(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this is a ServiceFailure error
    pub fn is_service_failure(&self) -> bool {
        matches!(self, Self::ServiceFailure { .. })
    }

    /// Check if this failure is worth retrying once.
    ///
    /// Only `ServiceFailure` carries a retryable hint; every other variant
    /// is a hard error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ServiceFailure { retryable: true, .. })
    }
}

impl From<std::io::Error> for InterviewError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for InterviewError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for InterviewError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (transitional, should be removed eventually)
impl From<anyhow::Error> for InterviewError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, InterviewError>`.
pub type Result<T> = std::result::Result<T, InterviewError>;
