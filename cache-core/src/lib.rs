#![forbid(unsafe_code, future_incompatible)]
#![deny(
    missing_docs,
    missing_debug_implementations,
    nonstandard_style,
    unused_qualifications,
    unused_import_braces,
    unused_extern_crates,
    trivial_casts,
    trivial_numeric_casts
)]
//! RFC 7234-flavored caching subsystem for a forward HTTP/1.1 proxy.
//!
//! This crate is the pure, synchronous core: a sharded cache store, a
//! freshness extractor, and a decision engine that turns a request's
//! `Cache-Control` directives and a cache lookup into one of
//! [`decision::Decision`]'s five actions. It does no I/O and knows nothing
//! about sockets, origin servers, or the wire format — that lives in the
//! `cache-proxy` binary crate, which is the only thing that calls into this
//! one.
//!
//! Nothing here returns a `Result`: a malformed directive or date is simply
//! not applied (the extractor falls back to defaults), an oversize insert is
//! a no-op, and a missing key is just [`shard::CacheStatus::NotInCache`] —
//! cache operations are total functions.
//!
//! ## Basic usage
//!
//! ```rust
//! use cache_core::{CacheConfig, ShardedCache};
//! use cache_core::headers::RawHeaders;
//! use std::time::SystemTime;
//!
//! let config = CacheConfig::default();
//! let cache = ShardedCache::new(config.shard_count, config.per_shard_budget());
//!
//! let (status, entry) = cache.lookup("http://example.com/", SystemTime::now());
//! assert!(entry.is_none());
//! let _ = status;
//! let _ = RawHeaders::new();
//! ```

pub mod clock;
pub mod config;
pub mod decision;
pub mod entry;
pub mod freshness;
pub mod headers;
pub mod shard;
pub mod sharded;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::CacheConfig;
pub use decision::{decide, Decision, EntryTiming};
pub use entry::CacheEntry;
pub use freshness::{extract as extract_freshness, FreshnessMetadata};
pub use headers::{CacheControl, RawHeaders};
pub use shard::{CacheShard, CacheStatus};
pub use sharded::ShardedCache;
