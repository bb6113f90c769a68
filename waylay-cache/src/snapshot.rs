//! Captured responses as stored in cache buckets

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use waylay_net::HttpResponse;

/// A captured HTTP response
///
/// Owned by the cache store once written. Snapshots are never mutated in
/// place; a revalidation replaces the whole entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// HTTP status code at capture time
    pub status: u16,
    /// Header name/value pairs at capture time
    pub headers: Vec<(String, String)>,
    /// Body bytes
    pub body: Bytes,
    /// Capture timestamp, seconds since the unix epoch
    pub captured_at: u64,
}

/// Sidecar metadata persisted next to the body file
///
/// The body length doubles as a commit marker: a body file whose size
/// disagrees with its sidecar is a torn write and reads as absent.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SnapshotMeta {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub captured_at: u64,
    pub body_len: u64,
}

impl Snapshot {
    /// Capture a response, stamping the current time
    pub fn capture(response: &HttpResponse) -> Self {
        Self {
            status: response.status,
            headers: response.headers.clone(),
            body: response.body.clone(),
            captured_at: unix_now(),
        }
    }

    /// Rehydrate the snapshot into a response for delivery
    pub fn to_response(&self) -> HttpResponse {
        HttpResponse {
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }

    /// Age of the snapshot in seconds
    pub fn age_secs(&self) -> u64 {
        unix_now().saturating_sub(self.captured_at)
    }

    pub(crate) fn meta(&self) -> SnapshotMeta {
        SnapshotMeta {
            status: self.status,
            headers: self.headers.clone(),
            captured_at: self.captured_at,
            body_len: self.body.len() as u64,
        }
    }

    pub(crate) fn from_parts(meta: SnapshotMeta, body: Bytes) -> Self {
        Self {
            status: meta.status,
            headers: meta.headers,
            body,
            captured_at: meta.captured_at,
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
