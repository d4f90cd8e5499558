//! Money types with precise decimal arithmetic
//!
//! This module provides a type-safe representation of monetary values
//! using rust_decimal for precise calculations without floating-point errors,
//! together with the fixed-rate currency converter used to normalise
//! line item charges into a bill's currency.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Currency codes following ISO 4217
///
/// Only [`Currency::USD`] and [`Currency::GEL`] are billable. The remaining
/// codes exist so that rate lookups for unsupported pairs stay expressible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    USD,
    GEL,
    EUR,
    GBP,
    JPY,
    CHF,
}

impl Currency {
    /// Currencies a bill or line item may be denominated in
    pub const BILLABLE: [Currency; 2] = [Currency::USD, Currency::GEL];

    /// Returns true if bills and line items may use this currency
    pub fn is_billable(&self) -> bool {
        Self::BILLABLE.contains(self)
    }

    /// Returns the number of decimal places for this currency
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Returns the ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::GEL => "GEL",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
            Currency::CHF => "CHF",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Currency::USD),
            "GEL" => Ok(Currency::GEL),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            "JPY" => Ok(Currency::JPY),
            "CHF" => Ok(Currency::CHF),
            other => Err(MoneyError::UnknownCurrency(other.to_string())),
        }
    }
}

/// Errors that can occur during money operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch: cannot operate on {0} and {1}")]
    CurrencyMismatch(String, String),

    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    #[error("Amount overflow in {0}")]
    Overflow(&'static str),
}

/// A monetary amount with associated currency
///
/// Amounts are stored with 4 decimal places internally so that conversion
/// and accrual multipliers do not lose precision before totals are taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    /// Creates a new Money value
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount: amount.round_dp(4),
            currency,
        }
    }

    /// Creates a zero amount in the specified currency
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: dec!(0),
            currency,
        }
    }

    /// Returns the amount
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Returns the currency
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is negative
    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    /// Rounds to the currency's standard decimal places
    pub fn round_to_currency(&self) -> Self {
        Self {
            amount: self.amount.round_dp(self.currency.decimal_places()),
            currency: self.currency,
        }
    }

    /// Checked addition that returns an error on currency mismatch
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                other.currency.to_string(),
            ));
        }
        self.amount
            .checked_add(other.amount)
            .map(|amount| Self::new(amount, self.currency))
            .ok_or(MoneyError::Overflow("addition"))
    }

    /// Multiplies by a scalar (e.g., for rate or accrual calculations)
    pub fn multiply(&self, factor: Decimal) -> Result<Money, MoneyError> {
        self.amount
            .checked_mul(factor)
            .map(|amount| Self::new(amount, self.currency))
            .ok_or(MoneyError::Overflow("multiplication"))
    }

    /// Multiplies by an integral quantity
    pub fn times(&self, quantity: u32) -> Result<Money, MoneyError> {
        self.multiply(Decimal::from(quantity))
    }

    /// Sums an iterator of amounts, all of which must be in `currency`
    pub fn sum<'a>(
        currency: Currency,
        amounts: impl IntoIterator<Item = &'a Money>,
    ) -> Result<Money, MoneyError> {
        amounts
            .into_iter()
            .try_fold(Money::zero(currency), |acc, m| acc.checked_add(m))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dp = self.currency.decimal_places();
        write!(
            f,
            "{} {:.dp$}",
            self.currency.code(),
            self.amount,
            dp = dp as usize
        )
    }
}

/// Rate-table currency converter
///
/// Looks up a multiplier for an ordered `(from, to)` pair. Identical
/// currencies convert at 1; pairs missing from the table pass the amount
/// through unchanged. Supported currencies are enforced at the request
/// boundary, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyConverter {
    rates: HashMap<(Currency, Currency), Decimal>,
}

impl CurrencyConverter {
    /// Creates a converter with an empty rate table (every pair passes through)
    pub fn new() -> Self {
        Self {
            rates: HashMap::new(),
        }
    }

    /// The fixed USD/GEL table used by billing periods
    pub fn fixed_rates() -> Self {
        Self::new()
            .with_rate(Currency::USD, Currency::GEL, dec!(2.5))
            .with_rate(Currency::GEL, Currency::USD, dec!(0.4))
    }

    /// Adds or replaces the rate for a directed pair
    pub fn with_rate(mut self, from: Currency, to: Currency, rate: Decimal) -> Self {
        self.rates.insert((from, to), rate);
        self
    }

    /// Returns the multiplier applied when converting `from` into `to`
    pub fn rate(&self, from: Currency, to: Currency) -> Decimal {
        if from == to {
            return Decimal::ONE;
        }
        self.rates.get(&(from, to)).copied().unwrap_or(Decimal::ONE)
    }

    /// Converts a raw amount between two currencies
    pub fn convert(&self, from: Currency, to: Currency, amount: Decimal) -> Result<Decimal, MoneyError> {
        amount
            .checked_mul(self.rate(from, to))
            .map(|converted| converted.round_dp(4))
            .ok_or(MoneyError::Overflow("conversion"))
    }

    /// Converts a Money value into `to`
    pub fn convert_money(&self, money: &Money, to: Currency) -> Result<Money, MoneyError> {
        self.convert(money.currency(), to, money.amount())
            .map(|amount| Money::new(amount, to))
    }
}

impl Default for CurrencyConverter {
    fn default() -> Self {
        Self::fixed_rates()
    }
}
