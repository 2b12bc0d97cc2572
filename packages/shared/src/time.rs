//! Time-related utilities with clock abstraction for testability.

use chrono::{DateTime, TimeDelta, Utc};

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Get the current time in UTC
    fn now(&self) -> DateTime<Utc>;
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed clock implementation for testing (returns a fixed time)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    fixed_time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time
    pub fn new(fixed_time: DateTime<Utc>) -> Self {
        Self { fixed_time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.fixed_time
    }
}

/// Describe how much time is left until `deadline`.
///
/// Returns `"overdue"` once the deadline has passed, otherwise the two most
/// significant units (e.g. `"2d 3h left"`, `"4h 10m left"`, `"12m left"`).
pub fn format_time_remaining(deadline: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let remaining = deadline - now;
    if remaining <= TimeDelta::zero() {
        return "overdue".to_string();
    }

    let days = remaining.num_days();
    let hours = remaining.num_hours() % 24;
    let minutes = remaining.num_minutes() % 60;

    if days > 0 {
        format!("{}d {}h left", days, hours)
    } else if hours > 0 {
        format!("{}h {}m left", hours, minutes)
    } else {
        format!("{}m left", minutes.max(1))
    }
}
