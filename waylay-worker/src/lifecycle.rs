//! Cache version lifecycle: Installing → Active → Superseded
//!
//! The manager owns the current version string; every bucket name the
//! strategy engine uses flows through [`LifecycleManager::bucket_for`], so
//! there is no ambient "current version" state anywhere else. Activation is
//! the only place buckets belonging to other versions are deleted.

use crate::classify::{Classifier, ResourceClass};
use crate::config::WorkerConfig;
use crate::metrics::MetricsRecorder;
use crate::{Error, Result};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use waylay_cache::{CacheStore, Identity, Snapshot};
use waylay_net::{HttpRequest, NetClient};

/// Lifecycle states of one worker version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Pre-populating caches; not yet serving
    Installing,
    /// Serving intercepted requests
    Active,
    /// A newer version is installing; serving in-flight requests only
    Superseded,
}

/// Owner of the current cache version and its bucket set
#[derive(Debug)]
pub struct LifecycleManager {
    version: String,
    state: RwLock<LifecycleState>,
    store: Arc<CacheStore>,
    net: Arc<NetClient>,
    config: Arc<WorkerConfig>,
    metrics: Arc<MetricsRecorder>,
    classifier: Classifier,
}

impl LifecycleManager {
    /// Create a manager in the `Installing` state
    pub fn new(
        store: Arc<CacheStore>,
        net: Arc<NetClient>,
        config: Arc<WorkerConfig>,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        let classifier = Classifier::new(&config);
        Self {
            version: config.version.clone(),
            state: RwLock::new(LifecycleState::Installing),
            store,
            net,
            config,
            metrics,
            classifier,
        }
    }

    /// The version this manager owns
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        *self.state.read()
    }

    /// The current bucket name for a resource class, e.g. `critical-v3`
    pub fn bucket_for(&self, class: ResourceClass) -> String {
        format!("{}-{}", class.logical_bucket(), self.version)
    }

    /// The version suffix of a bucket name, if it has one
    fn bucket_version(name: &str) -> Option<&str> {
        name.split_once('-').map(|(_, version)| version)
    }

    /// Pre-populate caches for this version
    ///
    /// Critical assets must all succeed — each is retried with exponential
    /// backoff first — or the install fails and the caller may retry it.
    /// Static assets are best-effort; failures are logged and skipped.
    pub async fn install(&self) -> Result<()> {
        info!("Installing version {}", self.version);

        for url in &self.config.critical_assets {
            self.precache_with_retry(url).await?;
        }
        for url in &self.config.static_assets {
            if let Err(e) = self.precache(url).await {
                warn!("Best-effort pre-population failed for {url}: {e}");
            }
        }

        info!(
            "Installed version {} ({} critical, {} static assets)",
            self.version,
            self.config.critical_assets.len(),
            self.config.static_assets.len()
        );
        Ok(())
    }

    /// Enter the `Active` state: reset metrics and delete every bucket
    /// belonging to a different version
    ///
    /// Deletion is unconditional — entries written by other versions are
    /// assumed incompatible with the current code.
    pub async fn activate(&self) -> Result<()> {
        *self.state.write() = LifecycleState::Active;
        self.metrics.reset();
        info!("Activated version {}", self.version);

        for name in self.store.list_buckets().await? {
            if Self::bucket_version(&name) != Some(self.version.as_str()) {
                match self.store.delete_bucket(&name).await {
                    Ok(true) => debug!("Removed stale bucket {name}"),
                    Ok(false) => {}
                    Err(e) => warn!("Could not remove stale bucket {name}: {e}"),
                }
            }
        }
        Ok(())
    }

    /// Mark this version as superseded by a newer install
    pub fn supersede(&self) {
        *self.state.write() = LifecycleState::Superseded;
        info!("Version {} superseded", self.version);
    }

    /// Fetch a batch of URLs into their class buckets, best-effort
    ///
    /// Returns the number of URLs cached; a failure on one URL does not
    /// abort the rest. Idempotent: re-warming an already cached URL just
    /// overwrites the entry.
    pub async fn warm_cache(&self, urls: &[String]) -> usize {
        let mut cached = 0;
        for url in urls {
            match self.precache(url).await {
                Ok(()) => cached += 1,
                Err(e) => warn!("Warm-cache failed for {url}: {e}"),
            }
        }
        cached
    }

    /// Delete one bucket by name. Idempotent.
    pub async fn clear_cache(&self, bucket_name: &str) -> Result<bool> {
        Ok(self.store.delete_bucket(bucket_name).await?)
    }

    /// Entry counts per bucket, for external inspection tooling
    pub async fn cache_stats(&self) -> Result<BTreeMap<String, usize>> {
        let mut stats = BTreeMap::new();
        for name in self.store.list_buckets().await? {
            let bucket = self.store.open_bucket(&name).await?;
            stats.insert(name, bucket.entry_count());
        }
        Ok(stats)
    }

    /// Fetch one URL and store it in the bucket its class maps to
    async fn precache(&self, url: &str) -> Result<()> {
        let request = HttpRequest::get(url);
        let class = self.classifier.classify(&request);
        let timeout = self.config.timeouts.timeout_for(class);

        self.metrics.record_network_request();
        let response = self.net.fetch(&request, Some(timeout)).await?;
        if !response.is_success() {
            return Err(Error::precache_failed(url, response.status));
        }

        let bucket = self.store.open_bucket(&self.bucket_for(class)).await?;
        let identity = Identity::for_request(&request);
        bucket.put(&identity, &Snapshot::capture(&response)).await?;
        debug!("Pre-populated {url} into {}", bucket.name());
        Ok(())
    }

    async fn precache_with_retry(&self, url: &str) -> Result<()> {
        let retry = &self.config.install;
        let mut last_error = None;

        for attempt in 0..=retry.max_retries {
            if attempt > 0 {
                let backoff = self.backoff_for(attempt - 1);
                debug!("Retrying pre-population of {url} after {backoff:?}");
                tokio::time::sleep(backoff).await;
            }
            match self.precache(url).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(
                        "Pre-population attempt {} failed for {url}: {e}",
                        attempt + 1
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::precache_failed(url, 0)))
    }

    /// Exponential backoff with jitter for install retries
    fn backoff_for(&self, attempt: u32) -> Duration {
        let retry = &self.config.install;
        let base = retry.initial_backoff_ms as f64 * retry.backoff_multiplier.powi(attempt as i32);
        let capped = base.min(retry.max_backoff_ms as f64);

        let jitter_range = capped * retry.jitter_factor;
        let jitter = rand::random::<f64>() * 2.0 * jitter_range - jitter_range;
        Duration::from_millis((capped + jitter).max(0.0) as u64)
    }
}
