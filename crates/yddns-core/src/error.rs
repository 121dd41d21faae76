//! Error types for the refresh engine
//!
//! Every failure the core can produce is a value of [`Error`]; nothing in
//! this crate aborts the process.

use thiserror::Error;

/// Result type alias for refresh operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the refresh engine
#[derive(Error, Debug)]
pub enum Error {
    /// A domain referenced a template that is not configured
    #[error("template \"{0}\" not found")]
    TemplateNotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// WAN IP discovery failed
    #[error("WAN IP lookup failed: {0}")]
    WanIp(String),

    /// Transport-level HTTP failure (connection, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(String),

    /// The provider answered with a non-success status.
    ///
    /// Carries the trimmed response body, or the status line when the body
    /// was empty.
    #[error("{0}")]
    Rejected(String),

    /// Cache storage failure (read, write, decode)
    #[error("Storage error: {0}")]
    Storage(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a WAN IP lookup error
    pub fn wan_ip(msg: impl Into<String>) -> Self {
        Self::WanIp(msg.into())
    }

    /// Create an HTTP transport error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a provider rejection error
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Whether this error came from the cache layer
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_displays_bare_message() {
        let err = Error::rejected("500 Internal Server Error");
        assert_eq!(err.to_string(), "500 Internal Server Error");
    }

    #[test]
    fn template_not_found_names_template() {
        let err = Error::TemplateNotFound("dyndns".to_string());
        assert_eq!(err.to_string(), "template \"dyndns\" not found");
        assert!(!err.is_storage());
        assert!(Error::storage("disk full").is_storage());
    }
}
