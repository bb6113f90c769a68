//! Request and response value types crossing the interception boundary

use bytes::Bytes;

pub use reqwest::Method;

/// An intercepted HTTP request
///
/// This is the tuple the hosting environment hands to the interception
/// layer: method, absolute URL, header pairs, and an optional body. Header
/// lookups are case-insensitive, matching HTTP semantics.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute request URL
    pub url: String,
    /// Header name/value pairs in arrival order
    pub headers: Vec<(String, String)>,
    /// Optional request body
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Create a request with an arbitrary method and no headers or body
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Create a POST request with a body
    pub fn post(url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        let mut request = Self::new(Method::POST, url);
        request.body = Some(body.into());
        request
    }

    /// Append a header pair
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up the first header with the given name, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether this is a GET request
    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    /// Whether this request has mutating semantics (POST/PUT/PATCH/DELETE)
    pub fn is_mutating(&self) -> bool {
        matches!(
            self.method,
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE
        )
    }

    /// The `Range` header value, if any
    pub fn range(&self) -> Option<&str> {
        self.header("range")
    }
}

/// A materialized HTTP response
///
/// Bodies are fully buffered; streamed delivery is the hosting environment's
/// concern once the response crosses back over the boundary.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Header name/value pairs
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Bytes,
}

impl HttpResponse {
    /// Create a response with the given status and body
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Append a header pair
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up the first header with the given name, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the status code is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = HttpRequest::get("https://example.com/video.mp4")
            .with_header("Range", "bytes=0-1023");

        assert_eq!(request.header("range"), Some("bytes=0-1023"));
        assert_eq!(request.header("RANGE"), Some("bytes=0-1023"));
        assert_eq!(request.range(), Some("bytes=0-1023"));
        assert_eq!(request.header("accept"), None);
    }

    #[test]
    fn test_mutating_methods() {
        assert!(!HttpRequest::get("https://example.com/").is_mutating());
        assert!(HttpRequest::post("https://example.com/api", "{}").is_mutating());
        assert!(HttpRequest::new(Method::DELETE, "https://example.com/api/1").is_mutating());
        assert!(!HttpRequest::new(Method::HEAD, "https://example.com/").is_mutating());
    }

    #[test]
    fn test_response_success_range() {
        assert!(HttpResponse::new(200, "ok").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(304, "").is_success());
        assert!(!HttpResponse::new(503, "unavailable").is_success());
    }
}
