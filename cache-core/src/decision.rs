//! The cache-decision engine: a pure function from request directives and a
//! cache lookup result to one of five actions. No I/O, no clock access — the
//! caller computes any timing values against its own clock reading before
//! calling in.

use std::time::Duration;

use crate::headers::CacheControl;
use crate::shard::CacheStatus;

/// What the connection handler should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Forward to the origin with an unconditional GET.
    Direct,
    /// Issue a conditional GET to the origin to validate the stored entry.
    Revalidate,
    /// Serve the stored entry's bytes without contacting the origin.
    ReturnCache,
    /// Respond 504 directly (`only-if-cached` with no usable entry).
    Return504,
    /// Respond 304 directly.
    Return304,
    /// Forward to the origin, but the proxy must not alter body or
    /// content-coding-affecting headers.
    NoTransform,
}

/// Timing values derived from a cache entry against "now", computed by the
/// caller so this module never reads a clock itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryTiming {
    /// `now - entry.created_at`, clamped to zero.
    pub age: Duration,
    /// `entry.expires_at - now`, clamped to zero once past expiry.
    pub time_to_expiry: Duration,
    /// `max(0, now - entry.expires_at)`.
    pub stale_time: Duration,
}

/// Decides what to do with a request given its tokenized `Cache-Control`,
/// the cache lookup status, and (when an entry exists) its timing relative
/// to the caller's clock reading.
///
/// `timing` must be `Some` whenever `status != CacheStatus::NotInCache` —
/// every branch that inspects it is only reachable past that check.
pub fn decide(cc: &CacheControl, status: CacheStatus, timing: Option<EntryTiming>) -> Decision {
    if cc.contains("no-store") {
        return Decision::Direct;
    }

    if cc.contains("no-cache") {
        return Decision::Revalidate;
    }

    // `only-if-cached` must be checked ahead of the `NotInCache` fallback
    // below: a miss under `only-if-cached` is a 504, not a license to go to
    // the origin.
    if cc.contains("only-if-cached") {
        return if status == CacheStatus::InCacheValid {
            Decision::ReturnCache
        } else {
            Decision::Return504
        };
    }

    if status == CacheStatus::NotInCache {
        return Decision::Direct;
    }

    // `timing` is guaranteed Some from here on: status != NotInCache.
    let timing = timing.expect("entry timing required once status != NotInCache");

    if let Some(max_age) = cc.seconds_of("max-age") {
        let max_age = Duration::from_secs(max_age);
        return if timing.age <= max_age {
            if cc.contains("min-fresh") {
                apply_min_fresh(cc, timing)
            } else {
                Decision::ReturnCache
            }
        } else if cc.contains("max-stale") {
            apply_max_stale(cc, timing)
        } else {
            Decision::Direct
        };
    }

    if cc.contains("min-fresh") {
        return apply_min_fresh(cc, timing);
    }

    if cc.contains("max-stale") {
        return apply_max_stale(cc, timing);
    }

    if cc.contains("no-transform") {
        return Decision::NoTransform;
    }

    if status == CacheStatus::InCacheValid && cc.is_empty() {
        return Decision::ReturnCache;
    }

    match status {
        CacheStatus::InCacheNeedsValidation => Decision::Revalidate,
        CacheStatus::InCacheExpired => Decision::Direct,
        _ => Decision::Direct,
    }
}

fn apply_min_fresh(cc: &CacheControl, timing: EntryTiming) -> Decision {
    let delta = match cc.seconds_of("min-fresh") {
        Some(d) => Duration::from_secs(d),
        None => return Decision::Revalidate,
    };
    if timing.time_to_expiry > delta {
        Decision::ReturnCache
    } else {
        Decision::Revalidate
    }
}

fn apply_max_stale(cc: &CacheControl, timing: EntryTiming) -> Decision {
    match cc.seconds_of("max-stale") {
        None => Decision::ReturnCache,
        Some(delta) => {
            if timing.stale_time <= Duration::from_secs(delta) {
                Decision::ReturnCache
            } else {
                Decision::Revalidate
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn timing(age: u64, time_to_expiry: u64, stale_time: u64) -> EntryTiming {
        EntryTiming {
            age: Duration::from_secs(age),
            time_to_expiry: Duration::from_secs(time_to_expiry),
            stale_time: Duration::from_secs(stale_time),
        }
    }

    #[test]
    fn miss_is_direct_with_no_directives() {
        let cc = CacheControl::default();
        assert_eq!(
            decide(&cc, CacheStatus::NotInCache, None),
            Decision::Direct
        );
    }

    #[test]
    fn only_if_cached_on_a_true_miss_is_504_not_direct() {
        let cc = CacheControl::parse("only-if-cached");
        assert_eq!(
            decide(&cc, CacheStatus::NotInCache, None),
            Decision::Return504
        );
    }

    #[test]
    fn no_store_forces_direct_even_on_a_valid_entry() {
        let cc = CacheControl::parse("no-store");
        assert_eq!(
            decide(&cc, CacheStatus::InCacheValid, Some(timing(0, 60, 0))),
            Decision::Direct
        );
    }

    #[test]
    fn no_cache_forces_revalidation() {
        let cc = CacheControl::parse("no-cache");
        assert_eq!(
            decide(&cc, CacheStatus::InCacheValid, Some(timing(0, 60, 0))),
            Decision::Revalidate
        );
    }

    #[rstest]
    #[case(CacheStatus::InCacheValid, Decision::ReturnCache)]
    #[case(CacheStatus::InCacheExpired, Decision::Return504)]
    #[case(CacheStatus::InCacheNeedsValidation, Decision::Return504)]
    fn only_if_cached_serves_or_504s(#[case] status: CacheStatus, #[case] expected: Decision) {
        let cc = CacheControl::parse("only-if-cached");
        let t = Some(timing(0, 60, 0));
        assert_eq!(decide(&cc, status, t), expected);
    }

    #[test]
    fn empty_directives_on_a_valid_entry_return_cache() {
        let cc = CacheControl::default();
        assert_eq!(
            decide(&cc, CacheStatus::InCacheValid, Some(timing(0, 60, 0))),
            Decision::ReturnCache
        );
    }

    #[test]
    fn needs_validation_status_revalidates_with_no_directives() {
        let cc = CacheControl::default();
        assert_eq!(
            decide(&cc, CacheStatus::InCacheNeedsValidation, Some(timing(0, 60, 0))),
            Decision::Revalidate
        );
    }

    #[test]
    fn expired_status_goes_direct_with_no_directives() {
        let cc = CacheControl::default();
        assert_eq!(
            decide(&cc, CacheStatus::InCacheExpired, Some(timing(100, 0, 10))),
            Decision::Direct
        );
    }

    #[test]
    fn max_age_within_budget_returns_cache() {
        let cc = CacheControl::parse("max-age=60");
        assert_eq!(
            decide(&cc, CacheStatus::InCacheValid, Some(timing(30, 30, 0))),
            Decision::ReturnCache
        );
    }

    #[test]
    fn max_age_exceeded_without_max_stale_goes_direct() {
        let cc = CacheControl::parse("max-age=10");
        assert_eq!(
            decide(&cc, CacheStatus::InCacheValid, Some(timing(30, 30, 0))),
            Decision::Direct
        );
    }

    #[test]
    fn max_age_exceeded_with_max_stale_falls_through_to_max_stale() {
        let cc = CacheControl::parse("max-age=10, max-stale=100");
        assert_eq!(
            decide(&cc, CacheStatus::InCacheExpired, Some(timing(30, 0, 5))),
            Decision::ReturnCache
        );
    }

    #[test]
    fn max_age_within_budget_but_min_fresh_fails_revalidates() {
        let cc = CacheControl::parse("max-age=60, min-fresh=50");
        assert_eq!(
            decide(&cc, CacheStatus::InCacheValid, Some(timing(30, 30, 0))),
            Decision::Revalidate
        );
    }

    #[test]
    fn min_fresh_alone_returns_cache_when_satisfied() {
        let cc = CacheControl::parse("min-fresh=10");
        assert_eq!(
            decide(&cc, CacheStatus::InCacheValid, Some(timing(0, 30, 0))),
            Decision::ReturnCache
        );
    }

    #[test]
    fn min_fresh_alone_revalidates_when_not_satisfied() {
        let cc = CacheControl::parse("min-fresh=50");
        assert_eq!(
            decide(&cc, CacheStatus::InCacheValid, Some(timing(0, 30, 0))),
            Decision::Revalidate
        );
    }

    #[test]
    fn max_stale_without_value_accepts_any_staleness() {
        let cc = CacheControl::parse("max-stale");
        assert_eq!(
            decide(&cc, CacheStatus::InCacheExpired, Some(timing(1000, 0, 5_000))),
            Decision::ReturnCache
        );
    }

    #[test]
    fn max_stale_with_value_respects_the_bound() {
        let cc = CacheControl::parse("max-stale=10");
        assert_eq!(
            decide(&cc, CacheStatus::InCacheExpired, Some(timing(65, 0, 5))),
            Decision::ReturnCache
        );
        assert_eq!(
            decide(&cc, CacheStatus::InCacheExpired, Some(timing(65, 0, 20))),
            Decision::Revalidate
        );
    }

    #[test]
    fn no_transform_forwards_without_touching_body() {
        let cc = CacheControl::parse("no-transform");
        assert_eq!(
            decide(&cc, CacheStatus::InCacheExpired, Some(timing(0, 0, 10))),
            Decision::NoTransform
        );
    }

    #[test]
    fn decide_is_pure_given_identical_inputs() {
        let cc = CacheControl::parse("max-age=30");
        let t = Some(timing(10, 50, 0));
        let first = decide(&cc, CacheStatus::InCacheValid, t);
        let second = decide(&cc, CacheStatus::InCacheValid, t);
        assert_eq!(first, second);
    }
}
