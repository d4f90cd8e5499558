//! Billing domain errors

use thiserror::Error;

use core_kernel::{BillId, Currency, MoneyError};

/// Errors that can occur in the billing domain
///
/// Signal handlers never propagate these; they surface them inside
/// [`SignalOutcome::Ignored`](crate::signals::SignalOutcome) so the process can
/// log the dropped event and carry on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    /// Bill not found in the period
    #[error("Bill not found: {0}")]
    BillNotFound(BillId),

    /// A bill with the same id already exists in the period
    #[error("Bill already exists: {0}")]
    DuplicateBill(BillId),

    /// The bill is closed and can no longer change
    #[error("Bill is closed: {0}")]
    BillClosed(BillId),

    /// The billing period has terminated
    #[error("Billing period is closed: {0}")]
    PeriodClosed(String),

    /// A line item was not normalised into the bill currency
    #[error("Currency mismatch on bill {bill_id}: bill is {bill}, item is {item}")]
    CurrencyMismatch {
        bill_id: BillId,
        bill: Currency,
        item: Currency,
    },

    /// Line item quantity must be positive
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),

    /// A charge or total does not fit the decimal range
    #[error("Amount overflow on bill {bill_id}: {source}")]
    AmountOverflow {
        bill_id: BillId,
        source: MoneyError,
    },

    /// Settlement totals do not fit the decimal range
    #[error("Settlement overflow: {0}")]
    SettlementOverflow(MoneyError),

    /// The period definition is invalid
    #[error("Invalid billing period: {0}")]
    InvalidPeriod(String),
}

impl BillingError {
    /// Returns true for precondition misses that a handler drops silently
    pub fn is_precondition_miss(&self) -> bool {
        matches!(
            self,
            BillingError::BillNotFound(_)
                | BillingError::DuplicateBill(_)
                | BillingError::BillClosed(_)
                | BillingError::PeriodClosed(_)
        )
    }
}
