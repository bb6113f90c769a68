//! The interception boundary

use crate::classify::Classifier;
use crate::config::WorkerConfig;
use crate::fallback;
use crate::lifecycle::{LifecycleManager, LifecycleState};
use crate::metrics::{MetricsRecorder, MetricsSnapshot};
use crate::offline::{JOURNAL_FILE, OfflineQueue, OfflineTask};
use crate::strategy::StrategyEngine;
use crate::Result;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};
use waylay_cache::CacheStore;
use waylay_net::{HttpRequest, HttpResponse, NetClient};

/// What the worker decided to do with an intercepted request
#[derive(Debug)]
pub enum FetchOutcome {
    /// The worker owns this request; deliver this response
    Response(HttpResponse),
    /// The worker declines; let the native network stack handle it
    Passthrough,
}

/// The request-interception worker
///
/// One `Worker` instance corresponds to one installed version. The hosting
/// environment routes intercepted requests to [`Worker::handle_fetch`] and
/// forwards its lifecycle events (`on_install`, `on_activate`,
/// `on_connectivity_restored`, `on_periodic_tick`). No internal failure
/// ever crosses this boundary as an error: the worker either answers,
/// answers with a synthesized fallback, or declines to intercept.
#[derive(Debug)]
pub struct Worker {
    classifier: Classifier,
    engine: StrategyEngine,
    lifecycle: Arc<LifecycleManager>,
    queue: Arc<OfflineQueue>,
    metrics: Arc<MetricsRecorder>,
    net: Arc<NetClient>,
    tasks: TaskTracker,
}

impl Worker {
    /// Create a worker storing under the platform cache directory
    pub async fn new(config: WorkerConfig) -> Result<Self> {
        let store = CacheStore::new().await?;
        Self::assemble(config, store).await
    }

    /// Create a worker storing under a custom directory
    pub async fn with_base_dir(config: WorkerConfig, base_dir: impl AsRef<Path>) -> Result<Self> {
        let store = CacheStore::with_base_dir(base_dir).await?;
        Self::assemble(config, store).await
    }

    async fn assemble(config: WorkerConfig, store: CacheStore) -> Result<Self> {
        let config = Arc::new(config);
        let store = Arc::new(store);
        let net = Arc::new(NetClient::new()?);
        let metrics = Arc::new(MetricsRecorder::new(config.latency_window));
        let classifier = Classifier::new(&config);

        let lifecycle = Arc::new(LifecycleManager::new(
            Arc::clone(&store),
            Arc::clone(&net),
            Arc::clone(&config),
            Arc::clone(&metrics),
        ));

        let journal_path = store.base_dir().join(JOURNAL_FILE);
        let queue = Arc::new(
            OfflineQueue::open(journal_path, Arc::clone(&net), config.offline_retry_limit).await,
        );

        let tasks = TaskTracker::new();
        let engine = StrategyEngine::new(
            Arc::clone(&store),
            Arc::clone(&net),
            Arc::clone(&metrics),
            Arc::clone(&lifecycle),
            Arc::clone(&config),
            tasks.clone(),
        );

        Ok(Self {
            classifier,
            engine,
            lifecycle,
            queue,
            metrics,
            net,
            tasks,
        })
    }

    /// Decide how to satisfy one intercepted request
    ///
    /// GETs run the strategy their class maps to. Mutating methods are
    /// fetched live and queued for replay when the network is unreachable.
    /// Everything else (HEAD, OPTIONS, ...) is declined.
    pub async fn handle_fetch(&self, request: HttpRequest) -> FetchOutcome {
        if request.is_get() {
            let class = self.classifier.classify(&request);
            debug!("{} {} classified as {class}", request.method, request.url);

            match self.engine.execute(class, &request).await {
                Ok(response) => FetchOutcome::Response(response),
                Err(e) => {
                    warn!("Serving {class} fallback for {}: {e}", request.url);
                    self.metrics.record_error(class);
                    FetchOutcome::Response(fallback::for_class(class))
                }
            }
        } else if request.is_mutating() {
            self.metrics.record_network_request();
            match self.net.fetch(&request, None).await {
                Ok(response) => FetchOutcome::Response(response),
                Err(e) => {
                    warn!(
                        "Mutating request {} {} failed, queueing for replay: {e}",
                        request.method, request.url
                    );
                    let class = self.classifier.classify(&request);
                    self.metrics.record_error(class);
                    self.queue.enqueue(OfflineTask::from_request(&request)).await;
                    FetchOutcome::Response(fallback::service_unavailable())
                }
            }
        } else {
            FetchOutcome::Passthrough
        }
    }

    /// Install this version: pre-populate critical and static buckets
    pub async fn on_install(&self) -> Result<()> {
        self.lifecycle.install().await
    }

    /// Activate this version: reset metrics, delete stale-version buckets
    pub async fn on_activate(&self) -> Result<()> {
        self.lifecycle.activate().await
    }

    /// Connectivity came back; replay the offline queue
    pub async fn on_connectivity_restored(&self) -> usize {
        self.queue.drain().await
    }

    /// Periodic tick; opportunistically replay the offline queue
    pub async fn on_periodic_tick(&self) -> usize {
        self.queue.drain().await
    }

    /// Current lifecycle state
    pub fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Read-only metrics snapshot
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Entry counts per bucket
    pub async fn cache_stats(&self) -> Result<BTreeMap<String, usize>> {
        self.lifecycle.cache_stats().await
    }

    /// Delete one bucket by name. Idempotent, best-effort.
    pub async fn clear_cache(&self, bucket_name: &str) -> Result<bool> {
        self.lifecycle.clear_cache(bucket_name).await
    }

    /// Fetch a batch of URLs into their class buckets, best-effort
    pub async fn warm_cache(&self, urls: &[String]) -> usize {
        self.lifecycle.warm_cache(urls).await
    }

    /// Tasks currently waiting in the offline queue, head first
    pub fn pending_offline_tasks(&self) -> Vec<OfflineTask> {
        self.queue.pending()
    }

    /// Mark this version superseded and drain background tasks
    ///
    /// In-flight revalidations and deferred cache writes run to completion;
    /// nothing new is spawned afterwards.
    pub async fn shutdown(&self) {
        self.lifecycle.supersede();
        self.tasks.close();
        self.tasks.wait().await;
    }
}
