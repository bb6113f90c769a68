//! Request-interception decision engine
//!
//! This crate is the orchestrating half of the waylay workspace. Every
//! intercepted request flows through:
//!
//! 1. the [`Classifier`], a pure total mapping from request to
//!    [`ResourceClass`]
//! 2. the [`StrategyEngine`], which selects one of five caching strategies
//!    per class and runs it against the cache store and the live network
//! 3. the [`MetricsRecorder`], which counts hits/misses/errors and latencies
//!
//! Mutating requests that fail on an unreachable network land in the
//! [`OfflineQueue`] and are replayed when connectivity returns. The
//! [`LifecycleManager`] owns the current cache version: it pre-populates
//! critical buckets at install time and garbage-collects buckets from prior
//! versions at activation.
//!
//! The outermost surface is [`Worker`]: the hosting environment hands it
//! requests and lifecycle events, and receives either a response or an
//! explicit decline to intercept. No internal failure crosses that boundary
//! as an error; the worker synthesizes a class-appropriate fallback instead.
//!
//! # Example
//!
//! ```no_run
//! use waylay_worker::{FetchOutcome, Worker, WorkerConfig};
//! use waylay_net::HttpRequest;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = WorkerConfig::default();
//! config.version = "v3".to_string();
//! config.critical_assets = vec!["https://app.example.com/critical.css".into()];
//!
//! let worker = Worker::new(config).await?;
//! worker.on_install().await?;
//! worker.on_activate().await?;
//!
//! match worker.handle_fetch(HttpRequest::get("https://app.example.com/critical.css")).await {
//!     FetchOutcome::Response(response) => println!("served {}", response.status),
//!     FetchOutcome::Passthrough => println!("declined"),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod classify;
pub mod config;
mod error;
pub mod fallback;
pub mod lifecycle;
pub mod metrics;
pub mod offline;
pub mod strategy;
mod worker;

pub use classify::{Classifier, ResourceClass};
pub use config::WorkerConfig;
pub use error::{Error, Result};
pub use lifecycle::{LifecycleManager, LifecycleState};
pub use metrics::{MetricsRecorder, MetricsSnapshot};
pub use offline::{OfflineQueue, OfflineTask};
pub use strategy::{Strategy, StrategyEngine};
pub use worker::{FetchOutcome, Worker};
