//! Time source for freshness arithmetic.
//!
//! All age/expiry computation in this crate routes through a [`Clock`]
//! instead of calling [`SystemTime::now`] directly, so tests can supply a
//! [`FakeClock`] pinned to a specific instant rather than racing the wall
//! clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

/// A source of wall-clock time.
///
/// Implementations must be cheap to call and safe to share across threads;
/// the cache-decision engine and every shard operation call `now()` while
/// holding no locks of their own, so there's no re-entrancy concern, but a
/// handler may call it from many tasks concurrently.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> SystemTime;
}

/// The production clock, backed by [`SystemTime::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock that can be pinned and advanced, for deterministic tests.
///
/// Stores an offset in seconds from [`SystemTime::UNIX_EPOCH`] so it can be
/// shared behind an `Arc` and advanced from test code without a `Mutex`.
#[derive(Debug)]
pub struct FakeClock {
    epoch_seconds: AtomicU64,
}

impl FakeClock {
    /// Creates a clock pinned to the given instant.
    pub fn new(at: SystemTime) -> Self {
        let epoch_seconds = at
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self { epoch_seconds: AtomicU64::new(epoch_seconds) }
    }

    /// Creates a clock pinned to the Unix epoch plus `secs`.
    pub fn at_epoch_secs(secs: u64) -> Self {
        Self { epoch_seconds: AtomicU64::new(secs) }
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        self.epoch_seconds.fetch_add(delta.as_secs(), Ordering::SeqCst);
    }

    /// Sets the clock to an absolute instant.
    pub fn set(&self, at: SystemTime) {
        let epoch_seconds =
            at.duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default().as_secs();
        self.epoch_seconds.store(epoch_seconds, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH
            + Duration::from_secs(self.epoch_seconds.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_reports_pinned_time() {
        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let clock = FakeClock::new(at);
        assert_eq!(clock.now(), at);
    }

    #[test]
    fn fake_clock_advances() {
        let clock = FakeClock::at_epoch_secs(1_000);
        clock.advance(Duration::from_secs(60));
        assert_eq!(clock.now(), SystemTime::UNIX_EPOCH + Duration::from_secs(1_060));
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
