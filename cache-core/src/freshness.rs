//! Extracts cache freshness metadata from a raw response header block.
//!
//! This is a pure function of `(status, headers, now, default_ttl)` — it
//! never touches a clock itself, so the same header block always yields the
//! same metadata given the same `now`.

use std::time::{Duration, SystemTime};

use crate::headers::{CacheControl, RawHeaders};

/// Freshness metadata derived from a response, ready to become (part of) a
/// [`crate::entry::CacheEntry`].
///
/// `created_at` is not part of this type — it is the wall time at insertion,
/// set by the caller, not derived from the response headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreshnessMetadata {
    /// False if the response must never be stored (non-200 status, or
    /// `Cache-Control: no-store`/`private`).
    pub cacheable: bool,
    /// When the entry should be considered expired.
    pub expires_at: SystemTime,
    /// `ETag` value with surrounding quotes stripped; empty if absent.
    pub etag: String,
    /// Parsed `Last-Modified`, if present and parseable.
    pub last_modified: Option<SystemTime>,
    /// True iff the origin's `Cache-Control` contained `must-revalidate` or
    /// `no-cache`.
    pub must_revalidate: bool,
}

/// Extracts freshness metadata from a response's status and headers.
///
/// `now` is the wall time at which this response was received; `default_ttl`
/// is the TTL applied when the response carries no `max-age` or `Expires`
/// (spec default: one hour, but this crate makes it a configured value, see
/// [`crate::config::CacheConfig`]).
pub fn extract(
    status: u16,
    headers: &RawHeaders,
    now: SystemTime,
    default_ttl: Duration,
) -> FreshnessMetadata {
    let cc = CacheControl::from_headers(headers);

    let cacheable = status == 200 && !cc.contains("no-store") && !cc.contains("private");

    let expires_at = if let Some(delta) = cc.seconds_of("max-age") {
        now + Duration::from_secs(delta)
    } else if let Some(raw) = headers.get("Expires") {
        match httpdate::parse_http_date(raw) {
            Ok(parsed) if parsed > now => parsed,
            Ok(_) => now,
            Err(_) => now,
        }
    } else {
        now + default_ttl
    };

    let etag = headers
        .get("ETag")
        .map(|v| v.trim().trim_matches('"').to_string())
        .unwrap_or_default();

    let last_modified =
        headers.get("Last-Modified").and_then(|v| httpdate::parse_http_date(v).ok());

    let must_revalidate = cc.contains("must-revalidate") || cc.contains("no-cache");

    FreshnessMetadata { cacheable, expires_at, etag, last_modified, must_revalidate }
}
