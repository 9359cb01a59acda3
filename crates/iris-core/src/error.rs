//! Error types for the Iris backend.

use thiserror::Error;

/// A shared error type for the entire Iris application.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait.
///
/// The taxonomy follows the propagation policy of the gateway: only
/// `Validation` errors are ever surfaced to the caller as explicit failures.
/// `RemoteUnavailable` is the single variant that triggers the local
/// fallback path; any other variant is an unexpected fault and propagates.
#[derive(Error, Debug, Clone)]
pub enum IrisError {
    /// Client-caused request error (bad image type, oversized upload, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// The remote reasoning service could not produce an answer.
    ///
    /// Deliberately narrow: a missing credential or an exhausted candidate
    /// list maps here, a programming error does not.
    #[error("Remote reasoner unavailable: {0}")]
    RemoteUnavailable(String),

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

impl IrisError {
    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a RemoteUnavailable error
    pub fn remote_unavailable(message: impl Into<String>) -> Self {
        Self::RemoteUnavailable(message.into())
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

    /// Check if this is a client-visible validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this error should trigger the local fallback path
    pub fn is_remote_unavailable(&self) -> bool {
        matches!(self, Self::RemoteUnavailable(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for IrisError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for IrisError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for IrisError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for IrisError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, IrisError>`.
pub type Result<T> = std::result::Result<T, IrisError>;
