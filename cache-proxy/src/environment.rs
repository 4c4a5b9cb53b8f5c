//! The explicit dependency bundle every connection handler receives.
//!
//! The original implementation reaches its cache, its logger, and its config
//! through process-wide singletons (`Cache::getInstance()`,
//! `Logger::getInstance()`). That defeats dependency injection in tests and
//! forces hidden coupling across handler tasks. `Environment` threads the
//! same three things explicitly instead, built once at startup and cloned
//! (cheaply, via `Arc`) into every spawned task.

use std::sync::Arc;

use cache_core::{Clock, ShardedCache, SystemClock};

use crate::config::ProxyConfig;

/// Everything a connection handler needs besides the sockets it owns.
#[derive(Clone)]
pub struct Environment {
    /// The shared sharded cache store.
    pub cache: Arc<ShardedCache>,
    /// The time source used for all freshness arithmetic.
    pub clock: Arc<dyn Clock>,
    /// Proxy-wide configuration (timeouts, listen address, etc).
    pub config: Arc<ProxyConfig>,
}

impl Environment {
    /// Builds the production environment: a fresh sharded cache sized per
    /// `config`, and the system wall clock.
    pub fn new(config: ProxyConfig) -> Self {
        let cache_config = config.cache_config();
        let cache =
            Arc::new(ShardedCache::new(cache_config.shard_count, cache_config.per_shard_budget()));
        Self { cache, clock: Arc::new(SystemClock), config: Arc::new(config) }
    }

    /// Builds an environment around caller-supplied cache and clock, for
    /// tests that need deterministic time or a pre-seeded cache.
    pub fn with_parts(
        cache: Arc<ShardedCache>,
        clock: Arc<dyn Clock>,
        config: ProxyConfig,
    ) -> Self {
        Self { cache, clock, config: Arc::new(config) }
    }
}
