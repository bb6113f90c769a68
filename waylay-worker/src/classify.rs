//! Resource classification: request → routing category
//!
//! Classification is a pure, total function. Rules are evaluated in
//! priority order and the first match wins; anything unmatched — including
//! URLs that fail to parse — is a `page`. Classification never touches the
//! network or the cache.

use crate::config::WorkerConfig;
use std::collections::HashSet;
use url::Url;
use waylay_net::HttpRequest;

/// Video file extensions (rule 2)
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "m4v", "ogv", "avi", "mkv"];

/// Image file extensions, modern formats included (rule 3)
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "avif", "svg", "ico", "bmp"];

/// Font file extensions (rule 4)
const FONT_EXTENSIONS: &[&str] = &["woff", "woff2", "ttf", "otf", "eot"];

/// Style/script extensions (rule 7)
const STATIC_EXTENSIONS: &[&str] = &["css", "js", "mjs"];

/// The routing category of an intercepted request
///
/// Each class maps to exactly one caching strategy; see
/// [`Strategy::for_class`](crate::Strategy::for_class).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    /// Pre-declared critical assets, cached at install time
    Critical,
    /// Streaming media, served with range passthrough
    Video,
    /// Images
    Image,
    /// Web fonts, cached permanently once stored
    Font,
    /// API traffic, network-first
    Api,
    /// Analytics beacons, best-effort network-only
    Analytics,
    /// Styles, scripts, and pre-declared static assets
    Static,
    /// Everything else: navigations and unmatched traffic
    Page,
}

impl ResourceClass {
    /// All classes, in classification priority order
    pub const ALL: [Self; 8] = [
        Self::Critical,
        Self::Video,
        Self::Image,
        Self::Font,
        Self::Api,
        Self::Analytics,
        Self::Static,
        Self::Page,
    ];

    /// Stable lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Video => "video",
            Self::Image => "image",
            Self::Font => "font",
            Self::Api => "api",
            Self::Analytics => "analytics",
            Self::Static => "static",
            Self::Page => "page",
        }
    }

    /// The logical bucket this class stores into, before versioning
    ///
    /// API responses land in `dynamic`; analytics is never cached but maps
    /// there too for uniformity.
    pub fn logical_bucket(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Video => "video",
            Self::Image => "image",
            Self::Font => "font",
            Self::Api | Self::Analytics => "dynamic",
            Self::Static => "static",
            Self::Page => "page",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Critical => 0,
            Self::Video => 1,
            Self::Image => 2,
            Self::Font => 3,
            Self::Api => 4,
            Self::Analytics => 5,
            Self::Static => 6,
            Self::Page => 7,
        }
    }
}

impl std::fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pure request → class mapping built from static configuration
#[derive(Debug, Clone)]
pub struct Classifier {
    critical: HashSet<String>,
    static_assets: HashSet<String>,
    api_prefixes: Vec<String>,
    api_hosts: Vec<String>,
    font_hosts: Vec<String>,
    analytics_hosts: Vec<String>,
}

impl Classifier {
    /// Build a classifier from the worker configuration
    pub fn new(config: &WorkerConfig) -> Self {
        Self {
            critical: config.critical_assets.iter().cloned().collect(),
            static_assets: config.static_assets.iter().cloned().collect(),
            api_prefixes: config.api_prefixes.clone(),
            api_hosts: config.api_hosts.clone(),
            font_hosts: config.font_hosts.clone(),
            analytics_hosts: config.analytics_hosts.clone(),
        }
    }

    /// Classify a request. Total: every request maps to exactly one class.
    pub fn classify(&self, request: &HttpRequest) -> ResourceClass {
        let Ok(url) = Url::parse(&request.url) else {
            return ResourceClass::Page;
        };
        let path = url.path();
        let host = url.host_str().unwrap_or("");
        let extension = path_extension(path);
        let extension = extension.as_deref();

        // Rule 1: pre-declared critical assets, by full URL or by path.
        if self.critical.contains(request.url.as_str()) || self.critical.contains(path) {
            return ResourceClass::Critical;
        }
        // Rule 2: video extensions.
        if matches_extension(extension, VIDEO_EXTENSIONS) {
            return ResourceClass::Video;
        }
        // Rule 3: image extensions.
        if matches_extension(extension, IMAGE_EXTENSIONS) {
            return ResourceClass::Image;
        }
        // Rule 4: font extensions or known font CDNs.
        if matches_extension(extension, FONT_EXTENSIONS) || host_matches(host, &self.font_hosts) {
            return ResourceClass::Font;
        }
        // Rule 5: API prefixes or hosts.
        if self.api_prefixes.iter().any(|p| path.starts_with(p.as_str()))
            || host_matches(host, &self.api_hosts)
        {
            return ResourceClass::Api;
        }
        // Rule 6: analytics/telemetry hosts.
        if host_matches(host, &self.analytics_hosts) {
            return ResourceClass::Analytics;
        }
        // Rule 7: pre-declared static assets or style/script extensions.
        if self.static_assets.contains(request.url.as_str())
            || self.static_assets.contains(path)
            || matches_extension(extension, STATIC_EXTENSIONS)
        {
            return ResourceClass::Static;
        }
        // Rule 8: default.
        ResourceClass::Page
    }
}

/// Lowercased extension of the final path segment, if any
fn path_extension(path: &str) -> Option<String> {
    let segment = path.rsplit('/').next()?;
    let (_, extension) = segment.rsplit_once('.')?;
    if extension.is_empty() {
        None
    } else {
        Some(extension.to_ascii_lowercase())
    }
}

fn matches_extension(extension: Option<&str>, set: &[&str]) -> bool {
    extension.is_some_and(|e| set.contains(&e))
}

/// Exact or subdomain match against a host list
fn host_matches(host: &str, hosts: &[String]) -> bool {
    hosts
        .iter()
        .any(|h| host == h.as_str() || host.ends_with(&format!(".{h}")))
}
