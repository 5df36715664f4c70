//! Error types for the UI test agent

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the agent.
///
/// Only [`Error::Config`] and the transport family ([`Error::Http`], [`Error::Api`],
/// [`Error::Json`]) are ever surfaced to the caller of the agent loop. Everything a tool
/// produces is turned into a [`crate::ToolResult`] at the dispatch boundary.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration, including duplicate tool registrations
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Error response from the model service
    #[error("API error: {0}")]
    Api(String),

    /// Browser session misuse or driver failure
    #[error("Browser session error: {0}")]
    Session(String),

    /// One or more resource release steps failed
    #[error("Teardown failed: {}", .0.join("; "))]
    Teardown(Vec<String>),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Other errors
    #[error("Error: {0}")]
    Other(String),
}

impl Error {
    /// Create a new config error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a new API error
    pub fn api(msg: impl Into<String>) -> Self {
        Error::Api(msg.into())
    }

    /// Create a new browser session error
    pub fn session(msg: impl Into<String>) -> Self {
        Error::Session(msg.into())
    }

    /// Create a new invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a new other error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// True for failures talking to the model service.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Api(_) | Error::Json(_))
    }
}
