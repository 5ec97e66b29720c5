//! Unified error types for pagetrack

use thiserror::Error;

/// Unified error type for all pagetrack operations
#[derive(Error, Debug)]
pub enum PagetrackError {
    // Browser errors
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Capture failed: {0}")]
    Capture(String),

    #[error("Image conversion failed: {0}")]
    Image(String),

    // Remote service errors
    #[error("Remote request failed{}: {message}", status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    Remote { status: Option<u16>, message: String },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Job source error: {0}")]
    JobSource(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl PagetrackError {
    /// Remote error carrying an HTTP status
    pub fn remote_status(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Remote error without a status (transport failure, bad payload)
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            status: None,
            message: message.into(),
        }
    }

    /// HTTP status of a remote error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => *status,
            _ => None,
        }
    }
}

/// Result type alias using PagetrackError
pub type Result<T> = std::result::Result<T, PagetrackError>;
