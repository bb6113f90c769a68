//! Error types for the waylay-worker crate

use thiserror::Error;

/// Result type for worker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for worker operations
///
/// These circulate internally between the strategy engine, lifecycle
/// manager, and offline queue. The interception boundary never propagates
/// them to the caller; it converts them into synthesized fallback
/// responses.
#[derive(Debug, Error)]
pub enum Error {
    /// Network client error
    #[error("Network error: {0}")]
    Net(#[from] waylay_net::Error),

    /// Cache store error
    #[error("Cache error: {0}")]
    Cache(#[from] waylay_cache::Error),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be parsed
    #[error("Configuration error: {0}")]
    Json(#[from] serde_json::Error),

    /// A critical asset could not be pre-populated during install
    #[error("Pre-population failed for {url}: status {status}")]
    PrecacheFailed {
        /// The asset URL that failed
        url: String,
        /// The status the server answered with, or 0 for transport failure
        status: u16,
    },

    /// Neither network nor cache could satisfy the request
    #[error("Unreachable and not cached: {url}")]
    Unsatisfiable {
        /// The request URL
        url: String,
    },
}

impl Error {
    /// Create a pre-population failure error
    pub fn precache_failed(url: impl Into<String>, status: u16) -> Self {
        Self::PrecacheFailed {
            url: url.into(),
            status,
        }
    }

    /// Create an unsatisfiable-request error
    pub fn unsatisfiable(url: impl Into<String>) -> Self {
        Self::Unsatisfiable { url: url.into() }
    }
}
