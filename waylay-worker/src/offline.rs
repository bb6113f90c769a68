//! Durable FIFO queue of mutating requests that failed offline
//!
//! Tasks are journaled to a JSON file after every mutation, so queued
//! mutations survive a restart. Replays run one drain at a time; enqueues
//! may proceed while a drain is in progress and are picked up by the next
//! one.

use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use waylay_net::{HttpRequest, NetClient};

/// Journal file name, relative to the cache store root
pub const JOURNAL_FILE: &str = "offline-queue.json";

/// A deferred mutating request awaiting replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineTask {
    /// HTTP method, e.g. `POST`
    pub method: String,
    /// Absolute request URL
    pub url: String,
    /// Header pairs captured from the original request
    pub headers: Vec<(String, String)>,
    /// Request body, if any
    pub body: Option<Vec<u8>>,
    /// Enqueue timestamp, seconds since the unix epoch
    pub enqueued_at: u64,
    /// Failed replay attempts so far
    pub retries: u32,
}

impl OfflineTask {
    /// Capture a failed mutating request as a task
    pub fn from_request(request: &HttpRequest) -> Self {
        Self {
            method: request.method.to_string(),
            url: request.url.clone(),
            headers: request.headers.clone(),
            body: request.body.as_ref().map(|b| b.to_vec()),
            enqueued_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            retries: 0,
        }
    }

    /// Rebuild the request for replay. `None` if the journaled method is
    /// not a valid HTTP method (a corrupt journal entry).
    fn to_request(&self) -> Option<HttpRequest> {
        let method = self.method.parse().ok()?;
        let mut request = HttpRequest::new(method, self.url.clone());
        request.headers = self.headers.clone();
        request.body = self.body.clone().map(Bytes::from);
        Some(request)
    }
}

/// Durable FIFO of offline tasks with serialized drains
#[derive(Debug)]
pub struct OfflineQueue {
    journal_path: PathBuf,
    tasks: Mutex<VecDeque<OfflineTask>>,
    /// Held for the duration of one drain; `try_lock` makes concurrent
    /// drain calls no-ops instead of duplicating replays
    drain_guard: tokio::sync::Mutex<()>,
    retry_limit: u32,
    net: Arc<NetClient>,
}

impl OfflineQueue {
    /// Open the queue, reloading any journaled tasks from a prior run
    pub async fn open(journal_path: PathBuf, net: Arc<NetClient>, retry_limit: u32) -> Self {
        let tasks = match tokio::fs::read_to_string(&journal_path).await {
            Ok(content) => match serde_json::from_str::<Vec<OfflineTask>>(&content) {
                Ok(tasks) => {
                    if !tasks.is_empty() {
                        info!("Reloaded {} offline tasks from journal", tasks.len());
                    }
                    tasks.into()
                }
                Err(e) => {
                    warn!("Offline journal unreadable, starting empty: {e}");
                    VecDeque::new()
                }
            },
            Err(_) => VecDeque::new(),
        };

        Self {
            journal_path,
            tasks: Mutex::new(tasks),
            drain_guard: tokio::sync::Mutex::new(()),
            retry_limit,
            net,
        }
    }

    /// Append a task to the tail of the queue
    pub async fn enqueue(&self, task: OfflineTask) {
        debug!("Queueing offline task: {} {}", task.method, task.url);
        self.tasks.lock().push_back(task);
        self.persist().await;
    }

    /// Replay queued tasks in FIFO order, removing each on success
    ///
    /// Only the tasks present at drain start are attempted; enqueues racing
    /// the drain wait for the next one. A failed replay goes back to the
    /// tail until it exhausts the retry limit, then it is dropped with a
    /// warning. Returns the number of successfully replayed tasks.
    pub async fn drain(&self) -> usize {
        let Ok(_guard) = self.drain_guard.try_lock() else {
            debug!("Drain already in progress, skipping");
            return 0;
        };

        let pending = self.tasks.lock().len();
        if pending == 0 {
            return 0;
        }
        info!("Draining offline queue: {pending} tasks");

        let mut replayed = 0;
        for _ in 0..pending {
            let Some(mut task) = self.tasks.lock().pop_front() else {
                break;
            };

            let Some(request) = task.to_request() else {
                warn!("Dropping corrupt offline task for {}", task.url);
                continue;
            };

            match self.net.fetch(&request, None).await {
                Ok(response) => {
                    debug!(
                        "Replayed {} {} -> {}",
                        task.method, task.url, response.status
                    );
                    replayed += 1;
                }
                Err(e) => {
                    task.retries += 1;
                    if task.retries >= self.retry_limit {
                        warn!(
                            "Dropping offline task {} {} after {} attempts: {e}",
                            task.method, task.url, task.retries
                        );
                    } else {
                        debug!(
                            "Replay failed for {} {} (attempt {}), requeueing: {e}",
                            task.method, task.url, task.retries
                        );
                        self.tasks.lock().push_back(task);
                    }
                }
            }
        }

        self.persist().await;
        replayed
    }

    /// Number of tasks currently queued
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    /// A copy of the queued tasks, head first
    pub fn pending(&self) -> Vec<OfflineTask> {
        self.tasks.lock().iter().cloned().collect()
    }

    /// Write the journal. Failures are logged, never surfaced: queue
    /// durability is best-effort and must not fail the caller's request.
    async fn persist(&self) {
        let snapshot: Vec<OfflineTask> = self.pending();
        let json = match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => json,
            Err(e) => {
                warn!("Could not serialize offline journal: {e}");
                return;
            }
        };
        if let Err(e) = tokio::fs::write(&self.journal_path, json).await {
            warn!("Could not write offline journal: {e}");
        }
    }
}
