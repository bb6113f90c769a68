//! Error types for waylay network operations

use thiserror::Error;

/// Error types for fetch operations
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed at the transport level
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Network timeout
    #[error("Request timeout after {duration_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds
        duration_ms: u64,
    },

    /// Header pair could not be encoded for the wire
    #[error("Invalid header: {name}")]
    InvalidHeader {
        /// The offending header name
        name: String,
    },
}

/// Result type for fetch operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a timeout error
    pub fn timeout(duration: std::time::Duration) -> Self {
        Self::Timeout {
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Create an invalid header error
    pub fn invalid_header(name: impl Into<String>) -> Self {
        Self::InvalidHeader { name: name.into() }
    }
}
