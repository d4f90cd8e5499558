//! Runtime clock
//!
//! [`TokioClock`] derives wall time from tokio's monotonic clock, so pausing
//! or advancing tokio time in tests moves the logical timestamps handed to
//! billing processes by exactly the same amount.

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use core_kernel::Clock;

/// Logical clock driven by `tokio::time`
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    anchor: Instant,
    anchor_at: DateTime<Utc>,
}

impl TokioClock {
    /// Anchors the clock at the current wall time
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Anchors the clock so that "now" reads `at`
    pub fn starting_at(at: DateTime<Utc>) -> Self {
        Self {
            anchor: Instant::now(),
            anchor_at: at,
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = Instant::now().saturating_duration_since(self.anchor);
        chrono::Duration::from_std(elapsed)
            .ok()
            .and_then(|d| self.anchor_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
