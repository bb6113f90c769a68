//! Pooled HTTP client with bounded timeouts

use crate::{Error, HttpRequest, HttpResponse, Result};
use reqwest::Client;
use reqwest::header::{HeaderName, HeaderValue};
use std::time::Duration;
use tracing::{debug, trace};

/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default request timeout, used when the caller does not pass one
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default connection pool size per host
const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 20;

/// Network client for executing intercepted requests
///
/// Wraps a pooled `reqwest` client. Every fetch is bounded: either by the
/// per-call timeout the strategy engine passes, or by the client-wide
/// default. A timed-out or unreachable fetch returns [`Error`]; a response
/// with a non-2xx status is returned as a normal [`HttpResponse`].
#[derive(Debug, Clone)]
pub struct NetClient {
    /// HTTP client with connection pooling
    client: Client,
    /// Fallback timeout for fetches without an explicit bound
    request_timeout: Duration,
    /// Custom user agent string
    user_agent: Option<String>,
}

impl NetClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for configuring the client
    pub fn builder() -> NetClientBuilder {
        NetClientBuilder::new()
    }

    /// Execute a request with a bounded timeout
    ///
    /// `timeout` overrides the client-wide default for this fetch only. The
    /// body is fully read before returning, so the timeout covers both the
    /// response head and the body transfer.
    pub async fn fetch(
        &self,
        request: &HttpRequest,
        timeout: Option<Duration>,
    ) -> Result<HttpResponse> {
        let timeout = timeout.unwrap_or(self.request_timeout);
        trace!("Fetching {} {} (timeout {:?})", request.method, request.url, timeout);

        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .timeout(timeout);

        if let Some(ref user_agent) = self.user_agent {
            builder = builder.header("User-Agent", user_agent);
        }
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::invalid_header(name))?;
            let value =
                HeaderValue::from_str(value).map_err(|_| Error::invalid_header(name.as_str()))?;
            builder = builder.header(name, value);
        }
        if let Some(ref body) = request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            debug!("Fetch failed for {}: {}", request.url, e);
            if e.is_timeout() {
                Error::timeout(timeout)
            } else {
                Error::Http(e)
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                Error::timeout(timeout)
            } else {
                Error::Http(e)
            }
        })?;

        trace!("Fetched {} -> {} ({} bytes)", request.url, status, body.len());
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Builder for configuring the network client
#[derive(Debug, Clone)]
pub struct NetClientBuilder {
    connect_timeout_secs: u64,
    request_timeout_secs: u64,
    pool_max_idle_per_host: usize,
    user_agent: Option<String>,
}

impl NetClientBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            user_agent: None,
        }
    }

    /// Set connection timeout in seconds
    pub fn connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    /// Set the default request timeout in seconds
    pub fn request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Set maximum idle connections per host
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Set a custom user agent string
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build the client
    pub fn build(self) -> Result<NetClient> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .gzip(true)
            .deflate(true)
            .build()?;

        Ok(NetClient {
            client,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            user_agent: self.user_agent,
        })
    }
}

impl Default for NetClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = NetClient::new().unwrap();
        assert_eq!(
            client.request_timeout,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
        );
        assert!(client.user_agent.is_none());
    }

    #[test]
    fn test_builder_configuration() {
        let client = NetClient::builder()
            .connect_timeout(5)
            .request_timeout(60)
            .pool_max_idle_per_host(50)
            .user_agent("waylay/0.2")
            .build()
            .unwrap();

        assert_eq!(client.request_timeout, Duration::from_secs(60));
        assert_eq!(client.user_agent, Some("waylay/0.2".to_string()));
    }
}
