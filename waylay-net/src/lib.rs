//! HTTP fetch client for the waylay interception layer
//!
//! This crate provides the network half of the interception engine:
//!
//! - Plain request/response value types that cross the interception boundary
//! - A pooled async client with configurable connect/request timeouts and
//!   per-request timeout overrides
//! - A transport error taxonomy that distinguishes timeouts from other
//!   connection failures
//!
//! Responses with non-2xx status codes are returned as ordinary responses,
//! not errors; only transport-level failures (DNS, connect, timeout) surface
//! as [`Error`].
//!
//! # Example
//!
//! ```no_run
//! use waylay_net::{HttpRequest, NetClient};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = NetClient::builder()
//!     .connect_timeout(5)
//!     .request_timeout(30)
//!     .build()?;
//!
//! let request = HttpRequest::get("https://example.com/app.css");
//! let response = client.fetch(&request, Some(Duration::from_secs(5))).await?;
//! println!("{} ({} bytes)", response.status, response.body.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod client;
mod error;
mod types;

pub use client::{NetClient, NetClientBuilder};
pub use error::{Error, Result};
pub use types::{HttpRequest, HttpResponse, Method};
