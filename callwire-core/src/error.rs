//! Error types for call plans and call execution.

use reqwest::StatusCode;
use std::sync::Arc;

/// The main error type for call operations.
///
/// Every payload is cheap to clone so a creation failure can be cached on a
/// call and replayed identically to each later caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CallError {
    /// Build-time configuration errors, attributed to one operation
    #[error("Configuration error ({method}): {message}")]
    Configuration { method: String, message: String },

    /// The request template could not produce a request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// I/O failures of the underlying byte source or socket
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// Network-related errors from the HTTP client
    #[error("Network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(Arc<serde_json::Error>),

    /// Converter failures that are not serialization errors
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Non-2xx responses surfaced by adapters that only expose the body
    #[error("HTTP {status}: {message}")]
    Http { status: StatusCode, message: String },

    /// The call was already executed
    #[error("Already executed")]
    AlreadyExecuted,

    /// The call was canceled
    #[error("Canceled")]
    Canceled,

    /// An object was used in a state that does not allow the operation
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// Unrecoverable failures; never cached and never swallowed
    #[error("Fatal error: {0}")]
    Fatal(String),

    /// Generic errors
    #[error("Error: {0}")]
    Other(String),
}

impl CallError {
    /// Create a configuration error for an operation
    pub fn configuration(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a conversion error
    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }

    /// Create an HTTP status error
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create an illegal state error
    pub fn illegal_state(msg: impl Into<String>) -> Self {
        Self::IllegalState(msg.into())
    }

    /// Create a fatal error
    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Check if this error must never be cached or contained
    pub fn is_fatal(&self) -> bool {
        matches!(self, CallError::Fatal(_))
    }

    /// Check if this error came from I/O on the wire or the body source
    pub fn is_io(&self) -> bool {
        matches!(self, CallError::Io(_) | CallError::Network(_))
    }
}

impl From<std::io::Error> for CallError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(Arc::new(e))
    }
}

impl From<reqwest::Error> for CallError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(Arc::new(e))
    }
}

impl From<serde_json::Error> for CallError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(Arc::new(e))
    }
}

impl From<String> for CallError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for CallError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}
