//! Logical time handling
//!
//! Billing periods never read a wall clock while handling events. Instead
//! the hosting runtime supplies timestamps through the [`Clock`] port and the
//! period's bounds are captured once in a [`BillingWindow`].

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Billing period length must be at least one day, got {0}")]
    InvalidLength(u32),

    #[error("Billing period length of {0} days is out of range")]
    LengthOutOfRange(u32),
}

/// The half-open window `[started_at, started_at + length_days)` of a billing period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingWindow {
    started_at: DateTime<Utc>,
    length_days: u32,
}

impl BillingWindow {
    /// Longest supported period, roughly ten years
    pub const MAX_LENGTH_DAYS: u32 = 3660;

    /// Creates a new window
    ///
    /// # Errors
    ///
    /// Returns an error if `length_days` is zero or above [`Self::MAX_LENGTH_DAYS`]
    pub fn new(started_at: DateTime<Utc>, length_days: u32) -> Result<Self, TemporalError> {
        if length_days == 0 {
            return Err(TemporalError::InvalidLength(length_days));
        }
        if length_days > Self::MAX_LENGTH_DAYS {
            return Err(TemporalError::LengthOutOfRange(length_days));
        }
        Ok(Self {
            started_at,
            length_days,
        })
    }

    /// Start of the window
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Length of the window in days
    pub fn length_days(&self) -> u32 {
        self.length_days
    }

    /// Calendar date the window started on (UTC)
    pub fn start_date(&self) -> NaiveDate {
        self.started_at.date_naive()
    }

    /// The instant the deadline timer fires
    pub fn deadline(&self) -> DateTime<Utc> {
        self.started_at + Duration::days(i64::from(self.length_days))
    }

    /// Time elapsed between the window start and `at` (negative before start)
    pub fn elapsed(&self, at: DateTime<Utc>) -> Duration {
        at - self.started_at
    }

    /// Time left until the deadline, clamped at zero
    pub fn remaining(&self, at: DateTime<Utc>) -> Duration {
        let remaining = self.deadline() - at;
        if remaining < Duration::zero() {
            Duration::zero()
        } else {
            remaining
        }
    }

    /// Returns true once `at` has reached the deadline
    pub fn has_elapsed(&self, at: DateTime<Utc>) -> bool {
        at >= self.deadline()
    }
}

/// Source of logical time for the hosting runtime
pub trait Clock: Send + Sync {
    /// Returns the current time
    fn now(&self) -> DateTime<Utc>;
}

/// A manually driven clock for tests and replays
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    /// Sets the clock to an absolute instant
    pub fn set(&self, at: DateTime<Utc>) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 21, 7, 0, 0).unwrap()
    }

    #[test]
    fn test_deadline() {
        let window = BillingWindow::new(start(), 30).unwrap();
        assert_eq!(window.deadline(), start() + Duration::days(30));
        assert_eq!(window.start_date(), NaiveDate::from_ymd_opt(2025, 8, 21).unwrap());
    }

    #[test]
    fn test_zero_length_rejected() {
        assert_eq!(
            BillingWindow::new(start(), 0),
            Err(TemporalError::InvalidLength(0))
        );
    }

    #[test]
    fn test_remaining_clamps_at_zero() {
        let window = BillingWindow::new(start(), 1).unwrap();
        assert_eq!(window.remaining(start() + Duration::days(2)), Duration::zero());
        assert!(window.has_elapsed(start() + Duration::days(1)));
        assert!(!window.has_elapsed(start() + Duration::hours(23)));
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(start());
        clock.advance(Duration::hours(2));
        assert_eq!(clock.now(), start() + Duration::hours(2));
    }
}
