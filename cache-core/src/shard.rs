//! A single partition of the cache: one map, one mutex, one byte budget.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;

use crate::entry::CacheEntry;

/// Result of a shard lookup, computed against the `now` passed to
/// [`CacheShard::lookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// No entry for this URL.
    NotInCache,
    /// Entry present, fresh, and not marked `must_revalidate`.
    InCacheValid,
    /// Entry present but `now >= expires_at`.
    InCacheExpired,
    /// Entry present, unexpired, but flagged `must_revalidate`.
    InCacheNeedsValidation,
}

struct ShardInner {
    entries: HashMap<String, Arc<CacheEntry>>,
    bytes_used: u64,
}

/// One mutex-guarded map of `url -> CacheEntry`, bounded by a byte budget.
///
/// Lookups hand out `Arc<CacheEntry>` handles so a caller can read the
/// entry's bytes (e.g. during origin I/O) without holding the shard's lock —
/// a shared immutable handle in place of a raw pointer into the map.
pub struct CacheShard {
    inner: Mutex<ShardInner>,
    budget: u64,
}

impl CacheShard {
    /// Creates an empty shard with the given byte budget.
    pub fn new(budget: u64) -> Self {
        Self {
            inner: Mutex::new(ShardInner { entries: HashMap::new(), bytes_used: 0 }),
            budget,
        }
    }

    /// The configured byte budget.
    pub fn budget(&self) -> u64 {
        self.budget
    }

    /// Bytes currently accounted for across all entries in this shard.
    pub fn bytes_used(&self) -> u64 {
        self.inner.lock().bytes_used
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Inserts an entry for `url`, evicting other entries (earliest
    /// `expires_at` first) until it fits. Entries larger than the shard's
    /// budget are silently skipped — `CacheOversize` per the error kinds
    /// table, which is not a hard failure — and `false` is returned.
    pub fn insert(&self, url: String, entry: CacheEntry) -> bool {
        let size = entry.size() as u64;
        if size > self.budget {
            tracing::debug!(url = %url, size, budget = self.budget, "entry too large to cache, skipping");
            return false;
        }

        let mut inner = self.inner.lock();

        if let Some(old) = inner.entries.remove(&url) {
            inner.bytes_used = inner.bytes_used.saturating_sub(old.size() as u64);
        }

        while inner.bytes_used + size > self.budget && !inner.entries.is_empty() {
            let victim = inner
                .entries
                .iter()
                .min_by(|a, b| {
                    a.1.expires_at.cmp(&b.1.expires_at).then_with(|| a.0.cmp(b.0))
                })
                .map(|(k, _)| k.clone());
            if let Some(victim) = victim {
                if let Some(evicted) = inner.entries.remove(&victim) {
                    inner.bytes_used = inner.bytes_used.saturating_sub(evicted.size() as u64);
                    tracing::debug!(url = %victim, "evicted entry to make room");
                }
            } else {
                break;
            }
        }

        inner.bytes_used += size;
        inner.entries.insert(url, Arc::new(entry));
        true
    }

    /// Looks up `url`, returning its [`CacheStatus`] and a shared handle to
    /// the entry when present.
    pub fn lookup(&self, url: &str, now: SystemTime) -> (CacheStatus, Option<Arc<CacheEntry>>) {
        let inner = self.inner.lock();
        match inner.entries.get(url) {
            None => (CacheStatus::NotInCache, None),
            Some(entry) => {
                let status = if now >= entry.expires_at {
                    CacheStatus::InCacheExpired
                } else if entry.must_revalidate {
                    CacheStatus::InCacheNeedsValidation
                } else {
                    CacheStatus::InCacheValid
                };
                (status, Some(Arc::clone(entry)))
            }
        }
    }

    /// Removes any entry for `url`.
    pub fn remove(&self, url: &str) {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.entries.remove(url) {
            inner.bytes_used = inner.bytes_used.saturating_sub(entry.size() as u64);
        }
    }

    /// Removes every entry with `expires_at <= now`.
    pub fn reap_expired(&self, now: SystemTime) {
        let mut inner = self.inner.lock();
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.expires_at <= now)
            .map(|(k, _)| k.clone())
            .collect();
        for url in expired {
            if let Some(entry) = inner.entries.remove(&url) {
                inner.bytes_used = inner.bytes_used.saturating_sub(entry.size() as u64);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::RawHeaders;
    use std::time::Duration;

    fn epoch(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn entry_of(size_body: usize, expires_at: SystemTime) -> CacheEntry {
        CacheEntry {
            response_line: "HTTP/1.1 200 OK".to_string(),
            response_headers: RawHeaders::new(),
            response_body: vec![0u8; size_body],
            created_at: epoch(0),
            expires_at,
            etag: String::new(),
            last_modified: None,
            must_revalidate: false,
        }
    }

    #[test]
    fn lookup_on_empty_shard_is_not_in_cache() {
        let shard = CacheShard::new(1024);
        let (status, entry) = shard.lookup("http://x/", epoch(0));
        assert_eq!(status, CacheStatus::NotInCache);
        assert!(entry.is_none());
    }

    #[test]
    fn insert_then_lookup_round_trips() {
        let shard = CacheShard::new(1024);
        let entry = entry_of(10, epoch(100));
        assert!(shard.insert("http://x/".to_string(), entry.clone()));
        let (status, got) = shard.lookup("http://x/", epoch(50));
        assert_eq!(status, CacheStatus::InCacheValid);
        assert_eq!(*got.unwrap(), entry);
    }

    #[test]
    fn expired_entry_reports_expired_status() {
        let shard = CacheShard::new(1024);
        shard.insert("http://x/".to_string(), entry_of(10, epoch(100)));
        let (status, _) = shard.lookup("http://x/", epoch(200));
        assert_eq!(status, CacheStatus::InCacheExpired);
    }

    #[test]
    fn must_revalidate_entry_needs_validation_while_fresh() {
        let shard = CacheShard::new(1024);
        let mut entry = entry_of(10, epoch(100));
        entry.must_revalidate = true;
        shard.insert("http://x/".to_string(), entry);
        let (status, _) = shard.lookup("http://x/", epoch(50));
        assert_eq!(status, CacheStatus::InCacheNeedsValidation);
    }

    #[test]
    fn oversize_insert_is_a_no_op() {
        let shard = CacheShard::new(16);
        let entry = entry_of(100, epoch(100));
        assert!(!shard.insert("http://x/".to_string(), entry));
        assert_eq!(shard.len(), 0);
        assert_eq!(shard.bytes_used(), 0);
    }

    #[test]
    fn entry_exactly_at_budget_is_accepted() {
        let budget_line_headers_overhead = "HTTP/1.1 200 OK".len() + 2 + 0 + 2;
        let shard = CacheShard::new((budget_line_headers_overhead + 16) as u64);
        let entry = entry_of(16, epoch(100));
        assert!(shard.insert("http://x/".to_string(), entry));
    }

    #[test]
    fn eviction_picks_earliest_expiry_first() {
        let line_overhead = "HTTP/1.1 200 OK".len() + 2 + 0 + 2;
        let budget = (line_overhead + 10) as u64 * 2;
        let shard = CacheShard::new(budget);
        shard.insert("http://a/".to_string(), entry_of(10, epoch(50)));
        shard.insert("http://b/".to_string(), entry_of(10, epoch(200)));
        assert!(shard.insert("http://c/".to_string(), entry_of(10, epoch(300))));

        let (status_a, _) = shard.lookup("http://a/", epoch(0));
        assert_eq!(status_a, CacheStatus::NotInCache);
        let (status_b, _) = shard.lookup("http://b/", epoch(0));
        assert_eq!(status_b, CacheStatus::InCacheValid);
        let (status_c, _) = shard.lookup("http://c/", epoch(0));
        assert_eq!(status_c, CacheStatus::InCacheValid);
    }

    #[test]
    fn reinserting_same_url_replaces_rather_than_duplicates() {
        let shard = CacheShard::new(1024);
        shard.insert("http://x/".to_string(), entry_of(10, epoch(100)));
        shard.insert("http://x/".to_string(), entry_of(20, epoch(200)));
        assert_eq!(shard.len(), 1);
        let (_, entry) = shard.lookup("http://x/", epoch(0));
        assert_eq!(entry.unwrap().expires_at, epoch(200));
    }

    #[test]
    fn reap_expired_drops_only_past_deadline_entries() {
        let shard = CacheShard::new(1024);
        shard.insert("http://a/".to_string(), entry_of(10, epoch(100)));
        shard.insert("http://b/".to_string(), entry_of(10, epoch(500)));
        shard.reap_expired(epoch(200));
        assert_eq!(shard.len(), 1);
        let (status, _) = shard.lookup("http://b/", epoch(200));
        assert_eq!(status, CacheStatus::InCacheValid);
    }

    #[test]
    fn remove_drops_entry_and_frees_bytes() {
        let shard = CacheShard::new(1024);
        shard.insert("http://x/".to_string(), entry_of(10, epoch(100)));
        shard.remove("http://x/");
        assert_eq!(shard.len(), 0);
        assert_eq!(shard.bytes_used(), 0);
    }
}
