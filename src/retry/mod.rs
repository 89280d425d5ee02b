// ABOUTME: Retry primitives for transient operations.
// ABOUTME: Interval strategies, the attempt tracker, and their config values.

mod interval;
mod settings;
mod tracker;

pub use interval::{LimitedExponentialRetryInterval, LinearRetryInterval, RetryInterval};
pub use settings::{IntervalSettings, RetrySettings};
pub use tracker::RetryTracker;
