// ABOUTME: Integration tests for retry intervals and the retry tracker.
// ABOUTME: Covers attempt bounds, time budgets and capped exponential growth.

use deckhand::retry::{
    IntervalSettings, LimitedExponentialRetryInterval, LinearRetryInterval, RetryInterval,
    RetrySettings, RetryTracker,
};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn zero_wait() -> Arc<dyn RetryInterval> {
    Arc::new(LinearRetryInterval::new(Duration::ZERO))
}

mod tracker {
    use super::*;

    #[test]
    fn permits_exactly_max_retries_after_initial_try() {
        let mut tracker = RetryTracker::new(Some(3), None, zero_wait());
        let mut retries = 0;
        while tracker.try_attempt() {
            retries += 1;
            tracker.mark_failure();
        }
        assert_eq!(retries, 3);
        assert!(!tracker.can_retry());
    }

    #[test]
    fn zero_max_retries_fails_fast() {
        let mut tracker = RetryTracker::new(Some(0), None, zero_wait());
        assert!(!tracker.try_attempt());
    }

    #[test]
    fn time_limit_stops_retries() {
        let mut tracker = RetryTracker::new(None, Some(Duration::from_millis(20)), zero_wait());
        assert!(tracker.try_attempt());
        std::thread::sleep(Duration::from_millis(40));
        assert!(!tracker.try_attempt());
    }

    #[test]
    fn success_resets_the_budget() {
        let mut tracker = RetryTracker::new(Some(1), None, zero_wait());
        assert!(tracker.try_attempt());
        tracker.mark_failure();
        assert!(!tracker.try_attempt());

        tracker.mark_success();
        assert_eq!(tracker.current_try(), 0);
        assert!(tracker.try_attempt());
    }

    #[test]
    fn interval_follows_the_failure_count() {
        let interval = Arc::new(LimitedExponentialRetryInterval::for_cloud_operations());
        let mut tracker = RetryTracker::new(Some(10), None, interval);
        let mut waits = Vec::new();
        for _ in 0..7 {
            assert!(tracker.try_attempt());
            waits.push(tracker.current_interval().as_millis());
            tracker.mark_failure();
        }
        assert_eq!(waits, vec![1000, 2000, 4000, 8000, 16000, 30000, 30000]);
    }

    #[test]
    fn warning_logging_is_throttled() {
        let mut tracker = RetryTracker::new(None, None, zero_wait());
        let mut logged = Vec::new();
        for n in 0..25 {
            if tracker.should_log_warning() {
                logged.push(n);
            }
            tracker.mark_failure();
        }
        assert_eq!(logged, vec![0, 1, 2, 3, 4, 10, 20]);
    }
}

mod settings {
    use super::*;

    #[test]
    fn file_operation_profile_polls_quickly() {
        let settings = RetrySettings::file_operations();
        assert_eq!(settings.max_retries, Some(10_000));
        assert_eq!(settings.time_limit, Some(Duration::from_secs(60)));
        let interval = settings.interval.build();
        assert_eq!(interval.interval(0), Duration::from_millis(100));
        assert_eq!(interval.interval(1), Duration::from_millis(200));
        assert_eq!(interval.interval(5), Duration::from_millis(200));
    }

    #[test]
    fn cloud_profile_uses_default_exponential_interval() {
        let settings = RetrySettings::cloud();
        assert_eq!(settings.max_retries, Some(5));
        assert_eq!(settings.interval, IntervalSettings::default());
    }
}

proptest! {
    /// Exponential intervals never shrink and never exceed the cap.
    #[test]
    fn exponential_is_monotonic_and_capped(
        base_ms in 1u64..5_000,
        cap_ms in 1u64..60_000,
        attempt in 0u32..64,
    ) {
        let interval = LimitedExponentialRetryInterval::new(
            Duration::from_millis(base_ms),
            Duration::from_millis(cap_ms),
            2.0,
        );
        let current = interval.interval(attempt);
        let next = interval.interval(attempt + 1);
        prop_assert!(next >= current);
        prop_assert!(current <= Duration::from_millis(cap_ms));
    }

    /// Linear intervals grow by exactly one base step per failure.
    #[test]
    fn linear_grows_by_base(base_ms in 0u64..10_000, attempt in 0u32..1_000) {
        let base = Duration::from_millis(base_ms);
        let interval = LinearRetryInterval::new(base);
        prop_assert_eq!(interval.interval(attempt + 1) - interval.interval(attempt), base);
    }

    /// A tracker with K retries allows K attempts, never more.
    #[test]
    fn tracker_bound_holds(max in 0u32..50) {
        let mut tracker = RetryTracker::new(Some(max), None, zero_wait());
        let mut attempts = 0u32;
        while tracker.try_attempt() {
            attempts += 1;
            tracker.mark_failure();
        }
        prop_assert_eq!(attempts, max);
    }
}
