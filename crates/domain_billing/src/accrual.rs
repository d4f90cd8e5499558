//! Late-charge accrual
//!
//! Charges added once the grace window after the period start has passed
//! are multiplied by a penalty factor. The function is a step, not a ramp.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::CurrencyConverter;

/// Step function from elapsed period time to an accrual multiplier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccrualCalculator {
    grace: Duration,
    penalty_factor: Decimal,
}

impl AccrualCalculator {
    /// 24 hours of grace, 2.5× afterwards
    pub fn standard() -> Self {
        Self::new(Duration::hours(24), dec!(2.5))
    }

    pub fn new(grace: Duration, penalty_factor: Decimal) -> Self {
        Self {
            grace,
            penalty_factor,
        }
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    pub fn penalty_factor(&self) -> Decimal {
        self.penalty_factor
    }

    /// Returns 1 while `event_time` is at or before `period_start + grace`,
    /// the penalty factor strictly after it
    pub fn factor(&self, period_start: DateTime<Utc>, event_time: DateTime<Utc>) -> Decimal {
        if event_time > period_start + self.grace {
            self.penalty_factor
        } else {
            Decimal::ONE
        }
    }
}

impl Default for AccrualCalculator {
    fn default() -> Self {
        Self::standard()
    }
}

/// The pricing rules a billing period applies to added charges
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BillingRules {
    pub converter: CurrencyConverter,
    pub accrual: AccrualCalculator,
}

impl BillingRules {
    pub fn new(converter: CurrencyConverter, accrual: AccrualCalculator) -> Self {
        Self { converter, accrual }
    }
}
