//! Tunable knobs for the cache store, independent of any particular
//! transport or CLI surface.

use std::time::Duration;

use crate::sharded::DEFAULT_SHARD_COUNT;

/// Default TTL applied to responses carrying no freshness hint.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Default total cache size across all shards: 64 MiB.
pub const DEFAULT_TOTAL_BUDGET_BYTES: u64 = 64 * 1024 * 1024;

/// Configuration for a [`crate::sharded::ShardedCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Number of independent shards in the ring.
    pub shard_count: usize,
    /// Total byte budget across all shards; divided evenly per shard.
    pub total_budget_bytes: u64,
    /// TTL applied when a response carries no `max-age`/`Expires`.
    pub default_ttl: Duration,
}

impl CacheConfig {
    /// The byte budget handed to each individual shard.
    pub fn per_shard_budget(&self) -> u64 {
        self.total_budget_bytes / self.shard_count as u64
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            shard_count: DEFAULT_SHARD_COUNT,
            total_budget_bytes: DEFAULT_TOTAL_BUDGET_BYTES,
            default_ttl: DEFAULT_TTL,
        }
    }
}
