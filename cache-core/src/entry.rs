//! The stored unit of the cache: one response, plus the metadata needed to
//! answer freshness questions against a supplied "now".

use std::time::{Duration, SystemTime};

use crate::headers::RawHeaders;

/// One cached response. Immutable after construction — updates replace the
/// whole entry rather than mutating fields in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Status line bytes, e.g. `HTTP/1.1 200 OK`.
    pub response_line: String,
    /// Header block as received, order and casing intact.
    pub response_headers: RawHeaders,
    /// Response body, opaque to the cache.
    pub response_body: Vec<u8>,
    /// Wall time this entry was inserted.
    pub created_at: SystemTime,
    /// Wall time after which the entry is stale.
    pub expires_at: SystemTime,
    /// `ETag` value, quotes stripped; empty if the origin sent none.
    pub etag: String,
    /// Parsed `Last-Modified`, if the origin sent a parseable one.
    pub last_modified: Option<SystemTime>,
    /// True iff a cache holding this entry must revalidate before reuse.
    pub must_revalidate: bool,
}

impl CacheEntry {
    /// Total byte size counted against a shard's budget: status line plus
    /// CRLF, header block, blank-line separator, and body.
    pub fn size(&self) -> usize {
        self.response_line.len()
            + 2
            + self.response_headers.wire_len()
            + 2
            + self.response_body.len()
    }

    /// Seconds elapsed since insertion, clamped to zero (clock skew or a
    /// `now` earlier than `created_at` must never yield a negative age).
    pub fn age(&self, now: SystemTime) -> Duration {
        now.duration_since(self.created_at).unwrap_or_default()
    }

    /// Remaining time until expiry; zero (not negative) once past `expires_at`.
    /// Use [`Self::is_fresh`] to distinguish "expires right now" from
    /// "still fresh"; use [`Self::stale_time`] for how far past expiry.
    pub fn time_to_expiry(&self, now: SystemTime) -> Duration {
        self.expires_at.duration_since(now).unwrap_or_default()
    }

    /// How long past `expires_at` this entry is, zero if still fresh.
    pub fn stale_time(&self, now: SystemTime) -> Duration {
        now.duration_since(self.expires_at).unwrap_or_default()
    }

    /// True iff `now < expires_at`.
    pub fn is_fresh(&self, now: SystemTime) -> bool {
        now < self.expires_at
    }

    /// Serializes the entry exactly as it should be sent to a client:
    /// status line, CRLF, headers, blank line, body.
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size());
        out.extend_from_slice(self.response_line.as_bytes());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.response_headers.to_wire_bytes());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.response_body);
        out
    }
}
