//! Error types for the Zettelkasten cache.

use thiserror::Error;

/// Result type alias using groundwave's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Zettelkasten operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Identifier is not a well-formed UUID
    #[error("Invalid note id: {0}")]
    InvalidId(String),

    /// Remote answered with a non-success status
    #[error("Remote returned {status} for {url}")]
    RemoteStatus { status: u16, url: String },

    /// HTTP/network request failed before a status was received
    #[error("Request error: {0}")]
    Request(String),

    /// Org to HTML conversion failed
    #[error("Render error: {0}")]
    Render(String),

    /// No note carries the requested id
    #[error("Note not found: {0}")]
    NoteNotFound(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A cache build failed while listing a directory
    #[error("Build error: {0}")]
    Build(String),

    /// Operation was cancelled before completion
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a caller may treat this failure as a skip for the current cycle.
    ///
    /// Transport failures, timeouts, cancellation and 5xx responses are
    /// transient. Client errors and local failures are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Request(_) | Error::Cancelled(_) => true,
            Error::RemoteStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
