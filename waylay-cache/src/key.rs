//! Canonical cache keys derived from request identity

use sha2::{Digest, Sha256};
use waylay_net::HttpRequest;

/// Headers that participate in the cache identity of a request.
///
/// Two requests that differ only in a header outside this list map to the
/// same entry.
const VARY_HEADERS: &[&str] = &["range"];

/// Canonical key for one cache entry
///
/// Derived once from method + absolute URL + vary-relevant headers and
/// immutable afterwards. The sha256 digest of the canonical form names the
/// entry on disk; the canonical string itself is kept for logging.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    canonical: String,
    digest: String,
}

impl Identity {
    /// Derive the identity of a request
    pub fn for_request(request: &HttpRequest) -> Self {
        let mut canonical = format!("{} {}", request.method, request.url);
        for name in VARY_HEADERS {
            if let Some(value) = request.header(name) {
                canonical.push('\n');
                canonical.push_str(name);
                canonical.push_str(": ");
                canonical.push_str(value);
            }
        }

        let digest = hex::encode(Sha256::digest(canonical.as_bytes()));
        Self { canonical, digest }
    }

    /// The human-readable canonical form, e.g. `GET https://example.com/a.css`
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Hex sha256 digest of the canonical form; names the entry on disk
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waylay_net::Method;

    #[test]
    fn test_identity_is_stable() {
        let a = Identity::for_request(&HttpRequest::get("https://example.com/app.css"));
        let b = Identity::for_request(&HttpRequest::get("https://example.com/app.css"));
        assert_eq!(a, b);
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn test_identity_varies_by_url_and_method() {
        let get = Identity::for_request(&HttpRequest::get("https://example.com/x"));
        let head = Identity::for_request(&HttpRequest::new(
            Method::HEAD,
            "https://example.com/x",
        ));
        let other = Identity::for_request(&HttpRequest::get("https://example.com/y"));

        assert_ne!(get, head);
        assert_ne!(get, other);
    }

    #[test]
    fn test_identity_varies_by_range_header() {
        let plain = Identity::for_request(&HttpRequest::get("https://example.com/v.mp4"));
        let ranged = Identity::for_request(
            &HttpRequest::get("https://example.com/v.mp4").with_header("Range", "bytes=0-1023"),
        );

        assert_ne!(plain, ranged);
    }

    #[test]
    fn test_identity_ignores_other_headers() {
        let a = Identity::for_request(&HttpRequest::get("https://example.com/x"));
        let b = Identity::for_request(
            &HttpRequest::get("https://example.com/x").with_header("Accept", "text/html"),
        );

        assert_eq!(a, b);
    }
}
