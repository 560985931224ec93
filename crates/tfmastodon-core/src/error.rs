//! Error types for the provider plugin
//!
//! This module defines all error types used throughout the workspace.

use thiserror::Error;

/// Result type alias for provider operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the provider plugin
#[derive(Error, Debug)]
pub enum Error {
    /// A remote call failed while performing a resource operation
    #[error("{0}")]
    Client(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication against the remote server failed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Remote object not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Remote API errors that don't fit another variant
    #[error("API error ({api}): {message}")]
    Api {
        /// API name
        api: String,
        /// Error message
        message: String,
    },

    /// Malformed protocol traffic
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Resource operation requested before the provider was configured
    #[error("The provider has not been configured")]
    NotConfigured,

    /// Resource type that no factory was registered for
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// Plugin I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap a failed remote call made while performing `action`
    ///
    /// The resulting message reads `Unable to <action>, got error: <err>`.
    pub fn client(action: &str, err: impl std::fmt::Display) -> Self {
        Self::Client(format!("Unable to {}, got error: {}", action, err))
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an API-specific error
    pub fn api(api: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            api: api.into(),
            message: message.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Diagnostic summary shown to the user for this error
    pub fn summary(&self) -> &'static str {
        match self {
            Error::Client(_)
            | Error::Http(_)
            | Error::RateLimited(_)
            | Error::NotFound(_)
            | Error::Api { .. } => "Client Error",
            Error::Authentication(_) => "Unable to authenticate",
            Error::Config(_) => "Invalid Provider Configuration",
            Error::InvalidInput(_) => "Invalid Attribute Value",
            Error::Protocol(_) => "Protocol Error",
            Error::NotConfigured => "Provider Not Configured",
            Error::UnknownResource(_) => "Unknown Resource Type",
            Error::Json(_) => "Invalid Resource Data",
            Error::Io(_) | Error::Other(_) => "Internal Error",
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
