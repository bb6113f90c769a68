//! Named, versioned buckets of identity → snapshot mappings

use crate::snapshot::SnapshotMeta;
use crate::{Error, Identity, Result, Snapshot, ensure_dir};
use bytes::Bytes;
use dashmap::DashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

/// Suffix of the metadata sidecar written next to each body file
const META_SUFFIX: &str = ".meta";

/// The on-disk cache store
///
/// A store is a directory of buckets; a bucket is a directory of entries.
/// Opening a bucket is idempotent and cheap. Writes within one bucket are
/// serialized through a per-bucket lock; buckets are independent of each
/// other.
#[derive(Debug)]
pub struct CacheStore {
    /// Base directory holding one subdirectory per bucket
    base_dir: PathBuf,
    /// Per-bucket write locks, created lazily on first open
    write_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl CacheStore {
    /// Create a store in [the user's cache directory][crate::get_cache_dir]
    pub async fn new() -> Result<Self> {
        Self::with_base_dir(crate::get_cache_dir()?).await
    }

    /// Create a store with a custom base directory
    pub async fn with_base_dir(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        ensure_dir(&base_dir).await?;
        debug!("Initialized cache store at: {:?}", base_dir);
        Ok(Self {
            base_dir,
            write_locks: DashMap::new(),
        })
    }

    /// Get the base directory of this store
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Open a bucket, creating it if absent. Idempotent.
    pub async fn open_bucket(&self, name: &str) -> Result<Bucket> {
        validate_bucket_name(name)?;
        let dir = self.base_dir.join(name);
        ensure_dir(&dir).await?;

        let write_lock = self
            .write_locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        Ok(Bucket {
            name: name.to_string(),
            dir,
            write_lock,
        })
    }

    /// List the names of all buckets currently on disk, sorted
    pub async fn list_buckets(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.base_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete a bucket and every entry in it
    ///
    /// Returns:
    ///
    /// * `Ok(true)` if the bucket existed and was deleted
    /// * `Ok(false)` if the bucket did not exist
    /// * `Err` on other errors
    pub async fn delete_bucket(&self, name: &str) -> Result<bool> {
        validate_bucket_name(name)?;
        let dir = self.base_dir.join(name);
        self.write_locks.remove(name);

        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!("Deleted bucket {name}");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// A handle to one open bucket
#[derive(Debug, Clone)]
pub struct Bucket {
    name: String,
    dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl Bucket {
    /// The bucket's name, including its version suffix
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path where the body for `digest` lives.
    ///
    /// Entries fan out two levels deep: `abcdef… -> ab/cd/abcdef…`.
    fn entry_path(&self, digest: &str) -> PathBuf {
        let mut path = self.dir.clone();
        if digest.len() >= 4 {
            path.push(&digest[..2]);
            path.push(&digest[2..4]);
        }
        path.push(digest);
        path
    }

    /// Exact-identity lookup
    ///
    /// Returns `Ok(None)` for absent entries and for torn entries whose
    /// body length disagrees with the sidecar. Only genuine IO failures
    /// surface as `Err`.
    pub async fn lookup(&self, identity: &Identity) -> Result<Option<Snapshot>> {
        let body_path = self.entry_path(identity.digest());
        let meta_path = body_path.with_extension(&META_SUFFIX[1..]);

        let meta_bytes = match tokio::fs::read(&meta_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let meta: SnapshotMeta = serde_json::from_slice(&meta_bytes)?;

        let body = match tokio::fs::read(&body_path).await {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if body.len() as u64 != meta.body_len {
            warn!(
                "Torn entry in bucket {} for {}: meta says {} bytes, body has {}",
                self.name,
                identity,
                meta.body_len,
                body.len()
            );
            return Ok(None);
        }

        trace!("Cache hit in {} for {}", self.name, identity);
        Ok(Some(Snapshot::from_parts(meta, body)))
    }

    /// Store a snapshot, overwriting any existing entry for the identity
    ///
    /// Last write wins: concurrent puts for the same identity are serialized
    /// by the bucket lock and the later one replaces the earlier. The body
    /// is written before the sidecar so a reader never sees metadata without
    /// a body behind it.
    pub async fn put(&self, identity: &Identity, snapshot: &Snapshot) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let body_path = self.entry_path(identity.digest());
        let meta_path = body_path.with_extension(&META_SUFFIX[1..]);
        if let Some(parent) = body_path.parent() {
            ensure_dir(parent).await?;
        }

        tokio::fs::write(&body_path, &snapshot.body).await?;
        let meta = serde_json::to_vec(&snapshot.meta())?;
        tokio::fs::write(&meta_path, meta).await?;

        trace!(
            "Stored {} bytes in {} for {}",
            snapshot.body.len(),
            self.name,
            identity
        );
        Ok(())
    }

    /// Number of entries currently in the bucket
    ///
    /// Counts metadata sidecars, so a torn body-only write is not counted.
    pub fn entry_count(&self) -> usize {
        walkdir::WalkDir::new(&self.dir)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| {
                e.file_type().is_file()
                    && e.file_name()
                        .to_str()
                        .is_some_and(|n| n.ends_with(META_SUFFIX))
            })
            .count()
    }
}

/// Bucket names become directory names, so path separators are rejected
fn validate_bucket_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(Error::invalid_bucket_name(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_name_validation() {
        assert!(validate_bucket_name("critical-v3").is_ok());
        assert!(validate_bucket_name("static_2024.1").is_ok());
        assert!(validate_bucket_name("").is_err());
        assert!(validate_bucket_name("../escape").is_err());
        assert!(validate_bucket_name("a/b").is_err());
        assert!(validate_bucket_name(".hidden").is_err());
    }
}
