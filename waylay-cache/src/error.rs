//! Error types for the waylay-cache crate

use thiserror::Error;

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cache operations
#[derive(Debug, Error)]
pub enum Error {
    /// Cache directory could not be determined
    #[error("Could not determine cache directory for the current platform")]
    CacheDirectoryNotFound,

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Entry metadata could not be serialized or parsed
    #[error("Metadata error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bucket name contains path separators or is empty
    #[error("Invalid bucket name: {name}")]
    InvalidBucketName {
        /// The offending name
        name: String,
    },
}

impl Error {
    /// Create an invalid bucket name error
    pub fn invalid_bucket_name(name: impl Into<String>) -> Self {
        Self::InvalidBucketName { name: name.into() }
    }
}
