// ABOUTME: Retry interval strategies mapping an attempt index to a wait duration.
// ABOUTME: Linear and capped-exponential variants, both pure.

use std::fmt;
use std::time::Duration;

/// Maps a 0-based retry index to how long to wait before that retry.
pub trait RetryInterval: fmt::Debug + Send + Sync {
    fn interval(&self, attempt: u32) -> Duration;
}

/// Waits `base × n` before the nth retry, so index 0 waits exactly `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearRetryInterval {
    base: Duration,
}

impl LinearRetryInterval {
    pub fn new(base: Duration) -> Self {
        Self { base }
    }
}

impl RetryInterval for LinearRetryInterval {
    fn interval(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(attempt.saturating_add(1))
    }
}

/// Waits `min(base × multiplier^attempt, cap)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitedExponentialRetryInterval {
    base: Duration,
    cap: Duration,
    multiplier: f64,
}

impl LimitedExponentialRetryInterval {
    pub fn new(base: Duration, cap: Duration, multiplier: f64) -> Self {
        Self {
            base,
            cap,
            multiplier,
        }
    }

    /// Profile for cloud API calls: 1s, 2s, 4s ... capped at 30s.
    pub fn for_cloud_operations() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30), 2.0)
    }

    /// Profile for file operations: 100ms then every 200ms.
    pub fn for_file_operations() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_millis(200), 2.0)
    }
}

impl RetryInterval for LimitedExponentialRetryInterval {
    fn interval(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scaled = self.base.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = scaled.min(self.cap.as_secs_f64());
        if capped.is_finite() && capped >= 0.0 {
            Duration::from_secs_f64(capped)
        } else {
            self.cap
        }
    }
}
