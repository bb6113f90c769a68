//! The five caching strategies and the engine that runs them
//!
//! Strategy selection is a closed enum dispatched by a single match over
//! [`ResourceClass`], so adding a strategy is a compile-time-checked
//! change. Exactly one strategy runs per request; strategies are never
//! combined.
//!
//! Cache failures never fail a request here: a lookup error reads as a
//! miss, a write error is logged and swallowed. Network failures propagate
//! as `Err` only when the strategy has no cached fallback of its own — the
//! interception boundary turns those into synthesized responses.

use crate::classify::ResourceClass;
use crate::config::WorkerConfig;
use crate::fallback;
use crate::lifecycle::LifecycleManager;
use crate::metrics::MetricsRecorder;
use crate::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};
use waylay_cache::{Bucket, CacheStore, Identity, Snapshot};
use waylay_net::{HttpRequest, HttpResponse, NetClient};

/// One of the five interchangeable fetch strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Serve from cache, fetch on miss; optionally refresh in background
    CacheFirst {
        /// Whether a cache hit also issues a non-blocking network refresh
        revalidate: bool,
    },
    /// Fetch from network, fall back to cache on transport failure
    NetworkFirst,
    /// Serve stale from cache immediately, refresh concurrently
    StaleWhileRevalidate,
    /// Cache-first, but ranged requests bypass the cache and cache writes
    /// happen after response delivery
    CacheFirstRanged,
    /// Always fetch; never read or write the cache
    NetworkOnly,
}

impl Strategy {
    /// The strategy a resource class routes to
    pub fn for_class(class: ResourceClass) -> Self {
        match class {
            ResourceClass::Critical => Self::CacheFirst { revalidate: true },
            ResourceClass::Image => Self::CacheFirst { revalidate: false },
            // Fonts never change under the same URL; never revalidate.
            ResourceClass::Font => Self::CacheFirst { revalidate: false },
            ResourceClass::Video => Self::CacheFirstRanged,
            ResourceClass::Api => Self::NetworkFirst,
            ResourceClass::Analytics => Self::NetworkOnly,
            ResourceClass::Static | ResourceClass::Page => Self::StaleWhileRevalidate,
        }
    }
}

/// Executes strategies against the cache store and the live network
#[derive(Debug)]
pub struct StrategyEngine {
    store: Arc<CacheStore>,
    net: Arc<NetClient>,
    metrics: Arc<MetricsRecorder>,
    lifecycle: Arc<LifecycleManager>,
    config: Arc<WorkerConfig>,
    /// Supervises background refreshes and deferred cache writes so
    /// shutdown can drain them instead of leaking
    tasks: TaskTracker,
}

impl StrategyEngine {
    /// Create an engine over the shared store, client, and lifecycle handle
    pub fn new(
        store: Arc<CacheStore>,
        net: Arc<NetClient>,
        metrics: Arc<MetricsRecorder>,
        lifecycle: Arc<LifecycleManager>,
        config: Arc<WorkerConfig>,
        tasks: TaskTracker,
    ) -> Self {
        Self {
            store,
            net,
            metrics,
            lifecycle,
            config,
            tasks,
        }
    }

    /// Run the strategy for `class` against one GET request
    pub async fn execute(&self, class: ResourceClass, request: &HttpRequest) -> Result<HttpResponse> {
        let started = Instant::now();
        let timeout = self.config.timeouts.timeout_for(class);

        match Strategy::for_class(class) {
            Strategy::CacheFirst { revalidate } => {
                self.cache_first(class, request, revalidate, timeout, started)
                    .await
            }
            Strategy::NetworkFirst => self.network_first(class, request, timeout, started).await,
            Strategy::StaleWhileRevalidate => {
                self.stale_while_revalidate(class, request, timeout, started)
                    .await
            }
            Strategy::CacheFirstRanged => {
                self.cache_first_ranged(class, request, timeout, started)
                    .await
            }
            Strategy::NetworkOnly => self.network_only(request, timeout).await,
        }
    }

    async fn cache_first(
        &self,
        class: ResourceClass,
        request: &HttpRequest,
        revalidate: bool,
        timeout: Duration,
        started: Instant,
    ) -> Result<HttpResponse> {
        let identity = Identity::for_request(request);
        let bucket = self.open_current_bucket(class).await;

        if let Some(bucket) = &bucket {
            if let Some(snapshot) = self.lookup(bucket, &identity).await {
                self.metrics.record_hit(class, started.elapsed());
                if revalidate {
                    self.spawn_refresh(bucket.clone(), identity, request.clone(), timeout);
                }
                return Ok(snapshot.to_response());
            }
        }

        self.metrics.record_network_request();
        let response = self.net.fetch(request, Some(timeout)).await?;
        if response.is_success() {
            if let Some(bucket) = &bucket {
                self.store_snapshot(bucket, &identity, &response).await;
            }
        }
        self.metrics.record_miss(class, started.elapsed());
        Ok(response)
    }

    async fn network_first(
        &self,
        class: ResourceClass,
        request: &HttpRequest,
        timeout: Duration,
        started: Instant,
    ) -> Result<HttpResponse> {
        let identity = Identity::for_request(request);
        let bucket = self.open_current_bucket(class).await;

        self.metrics.record_network_request();
        match self.net.fetch(request, Some(timeout)).await {
            Ok(response) => {
                // Non-2xx is an answer, not a failure; only transport-level
                // errors fall back to cache. Still, only 2xx is worth keeping.
                if response.is_success() {
                    if let Some(bucket) = &bucket {
                        self.store_snapshot(bucket, &identity, &response).await;
                    }
                }
                self.metrics.record_miss(class, started.elapsed());
                Ok(response)
            }
            Err(e) => {
                debug!("Network-first fetch failed for {}: {e}", request.url);
                if let Some(bucket) = &bucket {
                    if let Some(snapshot) = self.lookup(bucket, &identity).await {
                        self.metrics.record_hit(class, started.elapsed());
                        return Ok(snapshot.to_response());
                    }
                }
                Err(e.into())
            }
        }
    }

    async fn stale_while_revalidate(
        &self,
        class: ResourceClass,
        request: &HttpRequest,
        timeout: Duration,
        started: Instant,
    ) -> Result<HttpResponse> {
        let identity = Identity::for_request(request);
        let bucket = self.open_current_bucket(class).await;

        if let Some(bucket) = &bucket {
            if let Some(snapshot) = self.lookup(bucket, &identity).await {
                // Serve stale synchronously; the refresh lands in the cache
                // after this response has already been delivered.
                self.metrics.record_hit(class, started.elapsed());
                self.spawn_refresh(bucket.clone(), identity, request.clone(), timeout);
                return Ok(snapshot.to_response());
            }
        }

        self.metrics.record_network_request();
        let response = self.net.fetch(request, Some(timeout)).await?;
        if response.is_success() {
            if let Some(bucket) = bucket {
                self.spawn_store(bucket, identity, response.clone());
            }
        }
        self.metrics.record_miss(class, started.elapsed());
        Ok(response)
    }

    async fn cache_first_ranged(
        &self,
        class: ResourceClass,
        request: &HttpRequest,
        timeout: Duration,
        started: Instant,
    ) -> Result<HttpResponse> {
        // Ranged media reads proxy straight through; partial content is
        // never cached, so the store sees neither a lookup nor a write.
        if request.range().is_some() {
            self.metrics.record_network_request();
            let response = self.net.fetch(request, Some(timeout)).await?;
            self.metrics.record_miss(class, started.elapsed());
            return Ok(response);
        }

        let identity = Identity::for_request(request);
        let bucket = self.open_current_bucket(class).await;

        if let Some(bucket) = &bucket {
            if let Some(snapshot) = self.lookup(bucket, &identity).await {
                self.metrics.record_hit(class, started.elapsed());
                return Ok(snapshot.to_response());
            }
        }

        self.metrics.record_network_request();
        let response = self.net.fetch(request, Some(timeout)).await?;
        if response.is_success() {
            if let Some(bucket) = bucket {
                // A large media body must never block response delivery.
                self.spawn_store(bucket, identity, response.clone());
            }
        }
        self.metrics.record_miss(class, started.elapsed());
        Ok(response)
    }

    async fn network_only(&self, request: &HttpRequest, timeout: Duration) -> Result<HttpResponse> {
        self.metrics.record_network_request();
        match self.net.fetch(request, Some(timeout)).await {
            Ok(response) => Ok(response),
            Err(e) => {
                // Analytics delivery is best-effort; answer with a no-op
                // instead of propagating.
                debug!("Dropping failed beacon for {}: {e}", request.url);
                Ok(fallback::empty_beacon())
            }
        }
    }

    /// Open the current-version bucket for a class
    ///
    /// Storage trouble here must not fail the request: the strategy keeps
    /// going without a cache.
    async fn open_current_bucket(&self, class: ResourceClass) -> Option<Bucket> {
        let name = self.lifecycle.bucket_for(class);
        match self.store.open_bucket(&name).await {
            Ok(bucket) => Some(bucket),
            Err(e) => {
                warn!("Could not open bucket {name}, continuing uncached: {e}");
                None
            }
        }
    }

    /// Lookup that treats store errors as misses
    async fn lookup(&self, bucket: &Bucket, identity: &Identity) -> Option<Snapshot> {
        match bucket.lookup(identity).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Lookup failed in {}, treating as miss: {e}", bucket.name());
                None
            }
        }
    }

    /// Store a snapshot inline, swallowing and logging failures
    ///
    /// A cache-write failure must never downgrade a successful response.
    async fn store_snapshot(&self, bucket: &Bucket, identity: &Identity, response: &HttpResponse) {
        let snapshot = Snapshot::capture(response);
        if let Err(e) = bucket.put(identity, &snapshot).await {
            warn!("Cache write failed in {}: {e}", bucket.name());
        }
    }

    /// Store a snapshot after the response has been delivered
    ///
    /// The write is supervised by the task tracker and survives caller
    /// cancellation; an aborted download should still populate the cache.
    fn spawn_store(&self, bucket: Bucket, identity: Identity, response: HttpResponse) {
        self.tasks.spawn(async move {
            let snapshot = Snapshot::capture(&response);
            if let Err(e) = bucket.put(&identity, &snapshot).await {
                warn!("Deferred cache write failed in {}: {e}", bucket.name());
            }
        });
    }

    /// Issue a non-blocking refresh whose success overwrites the entry
    ///
    /// Completion is observable only through the store's next read.
    fn spawn_refresh(
        &self,
        bucket: Bucket,
        identity: Identity,
        request: HttpRequest,
        timeout: Duration,
    ) {
        let net = Arc::clone(&self.net);
        let metrics = Arc::clone(&self.metrics);
        self.tasks.spawn(async move {
            metrics.record_network_request();
            match net.fetch(&request, Some(timeout)).await {
                Ok(response) if response.is_success() => {
                    let snapshot = Snapshot::capture(&response);
                    if let Err(e) = bucket.put(&identity, &snapshot).await {
                        warn!("Revalidation write failed in {}: {e}", bucket.name());
                    }
                }
                Ok(response) => {
                    debug!(
                        "Revalidation for {} answered {}, keeping stale entry",
                        request.url, response.status
                    );
                }
                Err(e) => debug!("Revalidation fetch failed for {}: {e}", request.url),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_to_strategy_mapping() {
        assert_eq!(
            Strategy::for_class(ResourceClass::Critical),
            Strategy::CacheFirst { revalidate: true }
        );
        assert_eq!(
            Strategy::for_class(ResourceClass::Image),
            Strategy::CacheFirst { revalidate: false }
        );
        assert_eq!(
            Strategy::for_class(ResourceClass::Font),
            Strategy::CacheFirst { revalidate: false }
        );
        assert_eq!(
            Strategy::for_class(ResourceClass::Video),
            Strategy::CacheFirstRanged
        );
        assert_eq!(Strategy::for_class(ResourceClass::Api), Strategy::NetworkFirst);
        assert_eq!(
            Strategy::for_class(ResourceClass::Analytics),
            Strategy::NetworkOnly
        );
        assert_eq!(
            Strategy::for_class(ResourceClass::Static),
            Strategy::StaleWhileRevalidate
        );
        assert_eq!(
            Strategy::for_class(ResourceClass::Page),
            Strategy::StaleWhileRevalidate
        );
    }
}
