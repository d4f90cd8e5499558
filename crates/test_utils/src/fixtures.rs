//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data for billing period tests. These fixtures
//! are consistent and predictable so expectations can be written as literals.

use chrono::{DateTime, Duration, TimeZone, Utc};
use core_kernel::{Currency, CustomerId, Money};
use rust_decimal_macros::dec;

use domain_billing::BillingPeriodInput;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Creates a standard USD amount
    pub fn usd_100() -> Money {
        Money::new(dec!(100.00), Currency::USD)
    }

    /// The GEL equivalent of [`Self::usd_100`] at the fixed rate
    pub fn gel_250() -> Money {
        Money::new(dec!(250.00), Currency::GEL)
    }

    /// Creates a zero amount
    pub fn usd_zero() -> Money {
        Money::zero(Currency::USD)
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Standard period start (Aug 21, 2025 07:00 UTC)
    pub fn period_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 21, 7, 0, 0).unwrap()
    }

    /// One hour into the period, inside the accrual grace window
    pub fn within_grace() -> DateTime<Utc> {
        Self::period_start() + Duration::hours(1)
    }

    /// Just past the 24 hour grace window
    pub fn after_grace() -> DateTime<Utc> {
        Self::period_start() + Duration::hours(24) + Duration::milliseconds(1)
    }
}

/// Fixture for customer identifiers
pub struct CustomerFixtures;

impl CustomerFixtures {
    pub fn standard() -> CustomerId {
        CustomerId::new("customer-c").unwrap()
    }

    pub fn other() -> CustomerId {
        CustomerId::new("customer-d").unwrap()
    }
}

/// Fixture for billing period inputs
pub struct PeriodFixtures;

impl PeriodFixtures {
    /// A 30 day USD period for the standard customer
    pub fn thirty_day_usd() -> BillingPeriodInput {
        BillingPeriodInput::new(
            CustomerFixtures::standard(),
            Currency::USD,
            30,
            TemporalFixtures::period_start(),
        )
    }

    /// A one day GEL period
    pub fn one_day_gel(customer: CustomerId) -> BillingPeriodInput {
        BillingPeriodInput::new(customer, Currency::GEL, 1, TemporalFixtures::period_start())
    }
}
