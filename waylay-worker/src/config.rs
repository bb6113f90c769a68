//! Static worker configuration, loaded once at startup

use crate::Result;
use crate::classify::ResourceClass;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Worker configuration
///
/// Everything the engine needs to know up front: the asset lists driving
/// classification and pre-population, the bucket version string, per-class
/// fetch timeouts, and queue/install retry policy. Loadable from JSON;
/// every field has a sensible default so partial files work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Version string baked into bucket names, e.g. `v3`
    pub version: String,
    /// URLs pre-populated at install time; classification rule 1
    pub critical_assets: Vec<String>,
    /// URLs pre-populated best-effort; classification rule 7
    pub static_assets: Vec<String>,
    /// Path prefixes that mark a request as API traffic
    pub api_prefixes: Vec<String>,
    /// Hosts that mark a request as API traffic
    pub api_hosts: Vec<String>,
    /// Font CDN hosts
    pub font_hosts: Vec<String>,
    /// Analytics/telemetry hosts
    pub analytics_hosts: Vec<String>,
    /// Per-class network fetch timeouts
    pub timeouts: ClassTimeouts,
    /// Replay attempts before an offline task is dropped
    pub offline_retry_limit: u32,
    /// Capacity of the rolling latency window
    pub latency_window: usize,
    /// Retry policy for critical pre-population during install
    pub install: InstallRetry,
}

/// Per-class network fetch timeouts, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassTimeouts {
    /// Critical assets
    pub critical_secs: u64,
    /// API requests (network-first)
    pub api_secs: u64,
    /// Navigation requests
    pub page_secs: u64,
    /// Static assets, images, and fonts
    pub asset_secs: u64,
    /// Video and other large media
    pub media_secs: u64,
    /// Analytics beacons
    pub analytics_secs: u64,
}

/// Retry policy for critical pre-population
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallRetry {
    /// Attempts after the first failure
    pub max_retries: u32,
    /// Initial backoff in milliseconds
    pub initial_backoff_ms: u64,
    /// Backoff ceiling in milliseconds
    pub max_backoff_ms: u64,
    /// Backoff multiplier
    pub backoff_multiplier: f64,
    /// Jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            version: "v1".to_string(),
            critical_assets: Vec::new(),
            static_assets: Vec::new(),
            api_prefixes: vec!["/api/".to_string()],
            api_hosts: Vec::new(),
            font_hosts: vec![
                "fonts.googleapis.com".to_string(),
                "fonts.gstatic.com".to_string(),
            ],
            analytics_hosts: vec![
                "google-analytics.com".to_string(),
                "googletagmanager.com".to_string(),
                "plausible.io".to_string(),
            ],
            timeouts: ClassTimeouts::default(),
            offline_retry_limit: 5,
            latency_window: 256,
            install: InstallRetry::default(),
        }
    }
}

impl Default for ClassTimeouts {
    fn default() -> Self {
        Self {
            critical_secs: 5,
            api_secs: 5,
            page_secs: 10,
            asset_secs: 10,
            media_secs: 30,
            analytics_secs: 5,
        }
    }
}

impl Default for InstallRetry {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10_000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl WorkerConfig {
    /// Load configuration from a JSON file
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl ClassTimeouts {
    /// The fetch timeout for a resource class
    pub fn timeout_for(&self, class: ResourceClass) -> Duration {
        let secs = match class {
            ResourceClass::Critical => self.critical_secs,
            ResourceClass::Api => self.api_secs,
            ResourceClass::Page => self.page_secs,
            ResourceClass::Static | ResourceClass::Image | ResourceClass::Font => self.asset_secs,
            ResourceClass::Video => self.media_secs,
            ResourceClass::Analytics => self.analytics_secs,
        };
        Duration::from_secs(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_policy() {
        let config = WorkerConfig::default();
        assert_eq!(config.offline_retry_limit, 5);
        assert_eq!(config.timeouts.api_secs, 5);
        assert_eq!(
            config.timeouts.timeout_for(ResourceClass::Video),
            Duration::from_secs(30)
        );
        assert!(config.critical_assets.is_empty());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: WorkerConfig = serde_json::from_str(
            r#"{
                "version": "v7",
                "critical_assets": ["https://example.com/critical.css"],
                "timeouts": { "api_secs": 3 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.version, "v7");
        assert_eq!(config.critical_assets.len(), 1);
        assert_eq!(config.timeouts.api_secs, 3);
        // Unspecified fields keep their defaults.
        assert_eq!(config.timeouts.page_secs, 10);
        assert_eq!(config.offline_retry_limit, 5);
    }
}
