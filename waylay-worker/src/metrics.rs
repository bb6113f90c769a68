//! Cache metrics: hit/miss/error counters and a rolling latency window
//!
//! Counters are process-scoped and intentionally volatile; the lifecycle
//! manager resets them at activation. All recording paths are safe under
//! concurrent increment from many in-flight strategy executions.

use crate::classify::ResourceClass;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const CLASS_COUNT: usize = ResourceClass::ALL.len();

/// Concurrent metrics recorder shared by all request handlers
#[derive(Debug)]
pub struct MetricsRecorder {
    hits: [AtomicU64; CLASS_COUNT],
    misses: [AtomicU64; CLASS_COUNT],
    errors: [AtomicU64; CLASS_COUNT],
    network_requests: AtomicU64,
    /// Rolling latency samples in milliseconds, oldest evicted first
    latencies: Mutex<VecDeque<u64>>,
    window: usize,
}

/// Read-only copy of the counters at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total cache hits
    pub hits: u64,
    /// Total cache misses (requests served from network)
    pub misses: u64,
    /// Total network fetches issued, revalidations included
    pub network_requests: u64,
    /// Total requests that fell through to a synthesized fallback
    pub errors: u64,
    /// Hit rate as a percentage (0.0 to 100.0)
    pub hit_rate: f64,
    /// Per-class breakdown, classification order
    pub per_class: Vec<ClassCounters>,
    /// Number of latency samples currently in the window
    pub latency_samples: usize,
    /// Mean latency over the window, milliseconds
    pub avg_latency_ms: f64,
    /// Maximum latency in the window, milliseconds
    pub max_latency_ms: u64,
}

/// Counters for one resource class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassCounters {
    /// Class name
    pub class: String,
    /// Cache hits
    pub hits: u64,
    /// Cache misses
    pub misses: u64,
    /// Fallback responses served
    pub errors: u64,
}

impl MetricsRecorder {
    /// Create a recorder with the given latency window capacity
    pub fn new(window: usize) -> Self {
        Self {
            hits: [const { AtomicU64::new(0) }; CLASS_COUNT],
            misses: [const { AtomicU64::new(0) }; CLASS_COUNT],
            errors: [const { AtomicU64::new(0) }; CLASS_COUNT],
            network_requests: AtomicU64::new(0),
            latencies: Mutex::new(VecDeque::with_capacity(window)),
            window,
        }
    }

    /// Record a request served from cache
    pub fn record_hit(&self, class: ResourceClass, latency: Duration) {
        self.hits[class.index()].fetch_add(1, Ordering::Relaxed);
        self.push_latency(latency);
    }

    /// Record a request served from network after a cache miss
    pub fn record_miss(&self, class: ResourceClass, latency: Duration) {
        self.misses[class.index()].fetch_add(1, Ordering::Relaxed);
        self.push_latency(latency);
    }

    /// Record a request that fell through to a synthesized fallback
    pub fn record_error(&self, class: ResourceClass) {
        self.errors[class.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Record one network fetch being issued
    pub fn record_network_request(&self) {
        self.network_requests.fetch_add(1, Ordering::Relaxed);
    }

    fn push_latency(&self, latency: Duration) {
        let mut window = self.latencies.lock();
        if window.len() == self.window {
            window.pop_front();
        }
        window.push_back(latency.as_millis() as u64);
    }

    /// Reset all counters and drop latency samples
    pub fn reset(&self) {
        for i in 0..CLASS_COUNT {
            self.hits[i].store(0, Ordering::Relaxed);
            self.misses[i].store(0, Ordering::Relaxed);
            self.errors[i].store(0, Ordering::Relaxed);
        }
        self.network_requests.store(0, Ordering::Relaxed);
        self.latencies.lock().clear();
    }

    /// Get a read-only snapshot of current counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        let per_class: Vec<ClassCounters> = ResourceClass::ALL
            .iter()
            .map(|&class| ClassCounters {
                class: class.as_str().to_string(),
                hits: self.hits[class.index()].load(Ordering::Relaxed),
                misses: self.misses[class.index()].load(Ordering::Relaxed),
                errors: self.errors[class.index()].load(Ordering::Relaxed),
            })
            .collect();

        let hits: u64 = per_class.iter().map(|c| c.hits).sum();
        let misses: u64 = per_class.iter().map(|c| c.misses).sum();
        let errors: u64 = per_class.iter().map(|c| c.errors).sum();
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        };

        let window = self.latencies.lock();
        let latency_samples = window.len();
        let avg_latency_ms = if window.is_empty() {
            0.0
        } else {
            window.iter().sum::<u64>() as f64 / window.len() as f64
        };
        let max_latency_ms = window.iter().copied().max().unwrap_or(0);

        MetricsSnapshot {
            hits,
            misses,
            network_requests: self.network_requests.load(Ordering::Relaxed),
            errors,
            hit_rate,
            per_class,
            latency_samples,
            avg_latency_ms,
            max_latency_ms,
        }
    }
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Worker metrics:")?;
        writeln!(
            f,
            "  Requests: {} hits, {} misses ({:.1}% hit rate), {} errors",
            self.hits, self.misses, self.hit_rate, self.errors
        )?;
        writeln!(f, "  Network fetches: {}", self.network_requests)?;
        writeln!(
            f,
            "  Latency: {:.1}ms avg, {}ms max over {} samples",
            self.avg_latency_ms, self.max_latency_ms, self.latency_samples
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_record_and_snapshot() {
        let metrics = MetricsRecorder::new(16);

        metrics.record_hit(ResourceClass::Static, Duration::from_millis(2));
        metrics.record_hit(ResourceClass::Static, Duration::from_millis(4));
        metrics.record_miss(ResourceClass::Api, Duration::from_millis(30));
        metrics.record_error(ResourceClass::Page);
        metrics.record_network_request();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.hits, 2);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.errors, 1);
        assert_eq!(snapshot.network_requests, 1);
        assert!((snapshot.hit_rate - 66.666).abs() < 0.01);
        assert_eq!(snapshot.latency_samples, 3);
        assert!((snapshot.avg_latency_ms - 12.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.max_latency_ms, 30);

        let static_row = &snapshot.per_class[ResourceClass::Static.index()];
        assert_eq!(static_row.class, "static");
        assert_eq!(static_row.hits, 2);
    }

    #[test]
    fn test_latency_window_evicts_oldest() {
        let metrics = MetricsRecorder::new(2);

        metrics.record_hit(ResourceClass::Page, Duration::from_millis(100));
        metrics.record_hit(ResourceClass::Page, Duration::from_millis(10));
        metrics.record_hit(ResourceClass::Page, Duration::from_millis(20));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.latency_samples, 2);
        assert_eq!(snapshot.max_latency_ms, 20);
        assert_eq!(snapshot.hits, 3);
    }

    #[test]
    fn test_reset_clears_everything() {
        let metrics = MetricsRecorder::new(16);
        metrics.record_hit(ResourceClass::Image, Duration::from_millis(1));
        metrics.record_miss(ResourceClass::Image, Duration::from_millis(1));
        metrics.record_network_request();

        metrics.reset();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.hits, 0);
        assert_eq!(snapshot.misses, 0);
        assert_eq!(snapshot.network_requests, 0);
        assert_eq!(snapshot.latency_samples, 0);
        assert_eq!(snapshot.hit_rate, 0.0);
    }

    #[test]
    fn test_concurrent_recording() {
        let metrics = Arc::new(MetricsRecorder::new(64));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let metrics = Arc::clone(&metrics);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    metrics.record_hit(ResourceClass::Static, Duration::from_millis(1));
                    metrics.record_miss(ResourceClass::Api, Duration::from_millis(1));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.hits, 800);
        assert_eq!(snapshot.misses, 800);
        assert!((snapshot.hit_rate - 50.0).abs() < 0.001);
    }
}
