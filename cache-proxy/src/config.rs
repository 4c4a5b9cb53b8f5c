//! Command-line and environment configuration surface.

use std::time::Duration;

use cache_core::CacheConfig;
use clap::Parser;

/// A forward HTTP/1.1 proxy with an RFC 7234-style response cache.
#[derive(Debug, Clone, Parser)]
#[command(name = "cache-proxy", version, about)]
pub struct ProxyConfig {
    /// Address to listen on.
    #[arg(long, env = "CACHE_PROXY_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen_addr: String,

    /// Number of independent cache shards.
    #[arg(long, env = "CACHE_PROXY_SHARD_COUNT", default_value_t = 8)]
    pub shard_count: usize,

    /// Total cache size across all shards, in bytes.
    #[arg(long, env = "CACHE_PROXY_CACHE_BYTES", default_value_t = 64 * 1024 * 1024)]
    pub cache_bytes: u64,

    /// TTL applied to responses with no freshness hint of their own, in
    /// seconds.
    #[arg(long, env = "CACHE_PROXY_DEFAULT_TTL_SECS", default_value_t = 3600)]
    pub default_ttl_secs: u64,

    /// Timeout for establishing a TCP connection to an origin server, in
    /// seconds.
    #[arg(long, env = "CACHE_PROXY_CONNECT_TIMEOUT_SECS", default_value_t = 5)]
    pub origin_connect_timeout_secs: u64,

    /// Timeout for a read from an origin server mid-exchange, in seconds.
    #[arg(long, env = "CACHE_PROXY_READ_TIMEOUT_SECS", default_value_t = 10)]
    pub origin_read_timeout_secs: u64,

    /// Idle timeout for an established `CONNECT` tunnel, in seconds.
    #[arg(long, env = "CACHE_PROXY_CONNECT_IDLE_TIMEOUT_SECS", default_value_t = 5)]
    pub connect_idle_timeout_secs: u64,

    /// `tracing_subscriber::EnvFilter` directive, e.g. `info` or
    /// `cache_proxy=debug,cache_core=info`.
    #[arg(long, env = "CACHE_PROXY_LOG", default_value = "info")]
    pub log_filter: String,
}

impl ProxyConfig {
    /// Builds the [`CacheConfig`] this proxy's cache store should use.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            shard_count: self.shard_count,
            total_budget_bytes: self.cache_bytes,
            default_ttl: Duration::from_secs(self.default_ttl_secs),
        }
    }

    /// Timeout for connecting to an origin.
    pub fn origin_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.origin_connect_timeout_secs)
    }

    /// Timeout for a read from an origin mid-exchange.
    pub fn origin_read_timeout(&self) -> Duration {
        Duration::from_secs(self.origin_read_timeout_secs)
    }

    /// Idle timeout for a `CONNECT` tunnel.
    pub fn connect_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_idle_timeout_secs)
    }
}
