//! Synthesized fallback responses
//!
//! When neither network nor cache can satisfy a request, the boundary
//! serves one of these instead of an error: a minimal offline page for
//! navigations, a placeholder image for image requests, an empty beacon
//! acknowledgement for analytics, and a plain-text 503 for everything else.

use crate::classify::ResourceClass;
use waylay_net::HttpResponse;

/// Minimal navigation fallback, served when a page is unreachable
const OFFLINE_PAGE: &str = "<!doctype html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>Offline</title></head>\n<body><h1>You are offline</h1><p>This page is not available without a network connection.</p></body>\n</html>\n";

/// 1x1 transparent GIF, served in place of unreachable images
const PLACEHOLDER_GIF: [u8; 43] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3B,
];

/// The class-appropriate fallback for a request nothing could satisfy
pub fn for_class(class: ResourceClass) -> HttpResponse {
    match class {
        ResourceClass::Page => HttpResponse::new(200, OFFLINE_PAGE)
            .with_header("content-type", "text/html; charset=utf-8"),
        ResourceClass::Image => HttpResponse::new(200, PLACEHOLDER_GIF.to_vec())
            .with_header("content-type", "image/gif"),
        ResourceClass::Analytics => empty_beacon(),
        _ => service_unavailable(),
    }
}

/// Empty acknowledgement for a best-effort analytics beacon
pub fn empty_beacon() -> HttpResponse {
    HttpResponse::new(204, "")
}

/// Plain-text 503 for requests with no richer fallback
pub fn service_unavailable() -> HttpResponse {
    HttpResponse::new(503, "Service unavailable: network unreachable and no cached copy\n")
        .with_header("content-type", "text/plain; charset=utf-8")
}
