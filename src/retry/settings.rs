// ABOUTME: Deserializable retry configuration.
// ABOUTME: Builds RetryTrackers from explicit values instead of global constants.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::interval::{LimitedExponentialRetryInterval, LinearRetryInterval, RetryInterval};
use super::tracker::RetryTracker;

/// Retry budget and interval strategy, as read from configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RetrySettings {
    #[serde(default)]
    pub max_retries: Option<u32>,

    #[serde(default, with = "humantime_serde")]
    pub time_limit: Option<Duration>,

    #[serde(default)]
    pub interval: IntervalSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum IntervalSettings {
    Linear {
        #[serde(with = "humantime_serde")]
        base: Duration,
    },
    Exponential {
        #[serde(with = "humantime_serde")]
        base: Duration,
        #[serde(with = "humantime_serde")]
        cap: Duration,
        #[serde(default = "default_multiplier")]
        multiplier: f64,
    },
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for IntervalSettings {
    fn default() -> Self {
        IntervalSettings::Exponential {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(30),
            multiplier: default_multiplier(),
        }
    }
}

impl IntervalSettings {
    pub fn build(&self) -> Arc<dyn RetryInterval> {
        match *self {
            IntervalSettings::Linear { base } => Arc::new(LinearRetryInterval::new(base)),
            IntervalSettings::Exponential {
                base,
                cap,
                multiplier,
            } => Arc::new(LimitedExponentialRetryInterval::new(base, cap, multiplier)),
        }
    }
}

impl RetrySettings {
    /// Cloud API calls: 1s doubling to 30s, five retries.
    pub fn cloud() -> Self {
        Self {
            max_retries: Some(5),
            time_limit: None,
            interval: IntervalSettings::default(),
        }
    }

    /// File operations: retry for up to a minute, polling every 100-200ms.
    pub fn file_operations() -> Self {
        Self {
            max_retries: Some(10_000),
            time_limit: Some(Duration::from_secs(60)),
            interval: IntervalSettings::Exponential {
                base: Duration::from_millis(100),
                cap: Duration::from_millis(200),
                multiplier: 2.0,
            },
        }
    }

    /// A single attempt with no retries and no waiting.
    pub fn no_retry() -> Self {
        Self {
            max_retries: Some(0),
            time_limit: None,
            interval: IntervalSettings::Linear {
                base: Duration::ZERO,
            },
        }
    }

    pub fn tracker(&self) -> RetryTracker {
        RetryTracker::new(self.max_retries, self.time_limit, self.interval.build())
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self::file_operations()
    }
}
