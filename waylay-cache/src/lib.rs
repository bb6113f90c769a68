//! Versioned on-disk response cache for the waylay interception layer
//!
//! This crate provides the persistent half of the interception engine:
//!
//! - [`Identity`] — the canonical cache key derived from a request's method,
//!   URL, and vary-relevant headers
//! - [`Snapshot`] — a captured response (status, headers, body, timestamp)
//! - [`CacheStore`] — named, versioned buckets of identity → snapshot
//!   mappings with enumeration and bulk delete
//!
//! Entries are laid out on disk as a raw body file plus a `.meta` JSON
//! sidecar, fanned out two levels deep by digest prefix
//! (`ab/cd/abcdef…`). Writes within a bucket are serialized; a torn or
//! missing entry reads as absent, never as an error the caller must handle.

use std::path::{Path, PathBuf};

mod error;
mod key;
mod snapshot;
mod store;

pub use error::{Error, Result};
pub use key::Identity;
pub use snapshot::Snapshot;
pub use store::{Bucket, CacheStore};

/// Get the base waylay cache directory
///
/// Returns a path like:
/// - Linux: `~/.cache/waylay`
/// - macOS: `~/Library/Caches/waylay`
/// - Windows: `C:\Users\{user}\AppData\Local\waylay\cache`
pub fn get_cache_dir() -> Result<PathBuf> {
    dirs::cache_dir()
        .ok_or(Error::CacheDirectoryNotFound)
        .map(|dir| dir.join("waylay"))
}

/// Ensure a directory exists, creating it if necessary
pub(crate) async fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if tokio::fs::metadata(path).await.is_err() {
        tokio::fs::create_dir_all(path).await?;
    }
    Ok(())
}
