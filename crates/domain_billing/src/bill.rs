//! Bills and line items
//!
//! A bill collects line items in a single currency while it is open. Closing
//! a bill freezes it: the status, close time, close reason and total never
//! change again, and no further items may be appended.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{BillId, Currency, LineItemId, Money, MoneyError};

use crate::error::BillingError;

/// Bill status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BillStatus {
    /// Accepting line items
    Open,
    /// Frozen, terminal
    Closed,
}

impl BillStatus {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Open => "OPEN",
            BillStatus::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown bill status
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid status: {0} (supported: OPEN, CLOSED)")]
pub struct UnknownBillStatus(pub String);

impl FromStr for BillStatus {
    type Err = UnknownBillStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(BillStatus::Open),
            "CLOSED" => Ok(BillStatus::Closed),
            other => Err(UnknownBillStatus(other.to_string())),
        }
    }
}

/// A charge on a bill
///
/// `amount` is the unit charge after currency conversion and accrual; the
/// value the caller originally submitted is kept in `submitted` for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Item ID
    pub id: LineItemId,
    /// Description
    pub description: String,
    /// Normalised unit amount in the bill currency
    pub amount: Money,
    /// Quantity (always positive)
    pub quantity: u32,
    /// Unit amount as submitted, in the submitted currency
    pub submitted: Money,
    /// Accrual multiplier applied on top of the conversion
    pub accrual_factor: Decimal,
    /// Logical time the item was added
    pub added_at: DateTime<Utc>,
}

impl LineItem {
    /// Calculates the total for this item (amount × quantity)
    pub fn total(&self) -> Result<Money, MoneyError> {
        self.amount.times(self.quantity)
    }
}

/// A bill within a billing period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    id: BillId,
    status: BillStatus,
    currency: Currency,
    total_amount: Money,
    line_items: Vec<LineItem>,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    closed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    close_reason: Option<String>,
}

impl Bill {
    /// Opens a new, empty bill
    pub fn open(id: BillId, currency: Currency, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            status: BillStatus::Open,
            currency,
            total_amount: Money::zero(currency),
            line_items: Vec::new(),
            created_at,
            closed_at: None,
            close_reason: None,
        }
    }

    pub fn id(&self) -> BillId {
        self.id
    }

    pub fn status(&self) -> BillStatus {
        self.status
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    pub fn close_reason(&self) -> Option<&str> {
        self.close_reason.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.status == BillStatus::Open
    }

    /// Returns true if line items can be added to this bill
    pub fn can_add_line_items(&self) -> bool {
        self.is_open()
    }

    /// Σ(amount × quantity) over the current line items
    pub fn calculate_total(&self) -> Result<Money, BillingError> {
        self.line_items
            .iter()
            .try_fold(Money::zero(self.currency), |acc, item| {
                item.total().and_then(|total| acc.checked_add(&total))
            })
            .map_err(|source| BillingError::AmountOverflow {
                bill_id: self.id,
                source,
            })
    }

    /// Appends a normalised line item and grows the total by amount × quantity
    ///
    /// # Errors
    ///
    /// * `BillClosed` if the bill no longer accepts items
    /// * `CurrencyMismatch` if the item was not converted into the bill currency
    /// * `InvalidQuantity` if the quantity is zero
    /// * `AmountOverflow` if amount × quantity or the new total is out of range;
    ///   the bill is left unchanged
    pub fn add_line_item(&mut self, item: LineItem) -> Result<(), BillingError> {
        if !self.can_add_line_items() {
            return Err(BillingError::BillClosed(self.id));
        }
        if item.amount.currency() != self.currency {
            return Err(BillingError::CurrencyMismatch {
                bill_id: self.id,
                bill: self.currency,
                item: item.amount.currency(),
            });
        }
        if item.quantity == 0 {
            return Err(BillingError::InvalidQuantity(item.quantity));
        }

        let total = item
            .total()
            .and_then(|line| self.total_amount.checked_add(&line))
            .map_err(|source| BillingError::AmountOverflow {
                bill_id: self.id,
                source,
            })?;
        self.total_amount = total;
        self.line_items.push(item);
        Ok(())
    }

    /// Closes the bill and recomputes its total from the line items
    ///
    /// # Errors
    ///
    /// Returns `BillClosed` if the bill was already closed; nothing changes.
    pub fn close(&mut self, reason: impl Into<String>, at: DateTime<Utc>) -> Result<(), BillingError> {
        if !self.is_open() {
            return Err(BillingError::BillClosed(self.id));
        }
        let total = self.calculate_total()?;
        self.status = BillStatus::Closed;
        self.closed_at = Some(at);
        self.close_reason = Some(reason.into());
        self.total_amount = total;
        Ok(())
    }
}
