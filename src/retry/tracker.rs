// ABOUTME: Stateful retry attempt counter with attempt and time budgets.
// ABOUTME: Wraps a RetryInterval to tell callers whether and how long to wait.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::interval::RetryInterval;

/// Tracks retries of a single operation.
///
/// The initial try happens outside the tracker. After each failure the caller
/// asks [`try_attempt`](Self::try_attempt) whether another attempt is allowed,
/// waits [`current_interval`](Self::current_interval), then calls
/// [`mark_failure`](Self::mark_failure). With `max_retries = Some(0)` no retry
/// is ever permitted.
#[derive(Debug, Clone)]
pub struct RetryTracker {
    max_retries: Option<u32>,
    time_limit: Option<Duration>,
    interval: Arc<dyn RetryInterval>,
    current_try: u32,
    started_at: Option<Instant>,
}

impl RetryTracker {
    /// `None` for either budget means unbounded on that axis.
    pub fn new(
        max_retries: Option<u32>,
        time_limit: Option<Duration>,
        interval: Arc<dyn RetryInterval>,
    ) -> Self {
        Self {
            max_retries,
            time_limit,
            interval,
            current_try: 0,
            started_at: None,
        }
    }

    /// Whether another attempt is permitted. Starts the time budget on first call.
    pub fn try_attempt(&mut self) -> bool {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
        self.can_retry()
    }

    /// Same check as `try_attempt` without starting the clock.
    pub fn can_retry(&self) -> bool {
        let attempts_left = self
            .max_retries
            .is_none_or(|max| self.current_try < max);
        let time_left = match (self.time_limit, self.started_at) {
            (Some(limit), Some(started)) => started.elapsed() < limit,
            _ => true,
        };
        attempts_left && time_left
    }

    /// Wait before the retry at the current 0-based index.
    pub fn current_interval(&self) -> Duration {
        self.interval.interval(self.current_try)
    }

    pub fn mark_failure(&mut self) {
        self.current_try = self.current_try.saturating_add(1);
    }

    /// Reset attempts and the time budget.
    pub fn mark_success(&mut self) {
        self.current_try = 0;
        self.started_at = None;
    }

    /// Number of failures recorded so far.
    pub fn current_try(&self) -> u32 {
        self.current_try
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }

    /// Throttles retry logging: the first few failures, then every tenth.
    pub fn should_log_warning(&self) -> bool {
        self.current_try < 5 || self.current_try % 10 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::{LimitedExponentialRetryInterval, LinearRetryInterval};

    fn linear(ms: u64) -> Arc<dyn RetryInterval> {
        Arc::new(LinearRetryInterval::new(Duration::from_millis(ms)))
    }

    #[test]
    fn zero_max_retries_never_permits() {
        let mut tracker = RetryTracker::new(Some(0), None, linear(10));
        assert!(!tracker.try_attempt());
        assert!(!tracker.can_retry());
    }

    #[test]
    fn permits_exactly_k_retries() {
        let mut tracker = RetryTracker::new(Some(3), None, linear(10));
        let mut permitted = 0;
        while tracker.try_attempt() {
            permitted += 1;
            tracker.mark_failure();
            assert!(permitted <= 3, "tracker should stop after three retries");
        }
        assert_eq!(permitted, 3);
        assert_eq!(tracker.current_try(), 3);
    }

    #[test]
    fn unbounded_tracker_keeps_permitting() {
        let mut tracker = RetryTracker::new(None, None, linear(1));
        for _ in 0..1000 {
            assert!(tracker.try_attempt());
            tracker.mark_failure();
        }
    }

    #[test]
    fn exhausted_time_budget_stops_retries() {
        let mut tracker = RetryTracker::new(None, Some(Duration::ZERO), linear(1));
        assert!(!tracker.try_attempt());
    }

    #[test]
    fn interval_follows_attempt_index() {
        let mut tracker = RetryTracker::new(
            Some(10),
            None,
            Arc::new(LimitedExponentialRetryInterval::for_cloud_operations()),
        );
        assert_eq!(tracker.current_interval(), Duration::from_secs(1));
        tracker.mark_failure();
        assert_eq!(tracker.current_interval(), Duration::from_secs(2));
        tracker.mark_failure();
        assert_eq!(tracker.current_interval(), Duration::from_secs(4));
    }

    #[test]
    fn success_resets_state() {
        let mut tracker = RetryTracker::new(Some(1), None, linear(5));
        assert!(tracker.try_attempt());
        tracker.mark_failure();
        assert!(!tracker.try_attempt());

        tracker.mark_success();
        assert_eq!(tracker.current_try(), 0);
        assert!(tracker.try_attempt());
    }

    #[test]
    fn warning_throttle() {
        let mut tracker = RetryTracker::new(None, None, linear(1));
        let mut logged = Vec::new();
        for _ in 0..25 {
            if tracker.should_log_warning() {
                logged.push(tracker.current_try());
            }
            tracker.mark_failure();
        }
        assert_eq!(logged, vec![0, 1, 2, 3, 4, 10, 20]);
    }
}
