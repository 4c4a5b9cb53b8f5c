//! Routes cache operations to one of a fixed ring of shards by hashing the
//! URL key, so clients working on disjoint URLs contend on independent
//! mutexes.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::SystemTime;

use crate::entry::CacheEntry;
use crate::shard::{CacheShard, CacheStatus};

/// Default shard count.
pub const DEFAULT_SHARD_COUNT: usize = 8;

/// A fixed-size ring of [`CacheShard`]s.
pub struct ShardedCache {
    shards: Vec<CacheShard>,
}

impl ShardedCache {
    /// Creates a cache with `shard_count` shards, each given `per_shard_budget`
    /// bytes.
    pub fn new(shard_count: usize, per_shard_budget: u64) -> Self {
        assert!(shard_count > 0, "shard count must be nonzero");
        let shards = (0..shard_count).map(|_| CacheShard::new(per_shard_budget)).collect();
        Self { shards }
    }

    /// Number of shards in the ring.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard_for(&self, url: &str) -> &CacheShard {
        let mut hasher = DefaultHasher::new();
        url.hash(&mut hasher);
        let index = (hasher.finish() as usize) % self.shards.len();
        &self.shards[index]
    }

    /// Inserts an entry for `url` into its shard. Returns `false` if the
    /// entry exceeded that shard's byte budget and was skipped.
    pub fn insert(&self, url: String, entry: CacheEntry) -> bool {
        self.shard_for(&url).insert(url, entry)
    }

    /// Looks up `url` in its shard.
    pub fn lookup(&self, url: &str, now: SystemTime) -> (CacheStatus, Option<Arc<CacheEntry>>) {
        self.shard_for(url).lookup(url, now)
    }

    /// Removes any entry for `url`.
    pub fn remove(&self, url: &str) {
        self.shard_for(url).remove(url)
    }

    /// Reaps expired entries across every shard.
    pub fn reap_expired(&self, now: SystemTime) {
        for shard in &self.shards {
            shard.reap_expired(now);
        }
    }

    /// Total bytes in use across every shard.
    pub fn bytes_used(&self) -> u64 {
        self.shards.iter().map(CacheShard::bytes_used).sum()
    }
}
