//! Signal handlers
//!
//! Signals are fire-and-forget: the sender gets no answer, so a handler that
//! cannot apply its signal logs the reason and leaves the period untouched.
//! Handlers never read a clock; the process passes in the logical time of
//! the event.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use core_kernel::{BillId, Currency, LineItemId, Money};

use crate::accrual::BillingRules;
use crate::bill::{Bill, LineItem};
use crate::error::BillingError;
use crate::period::{BillingPeriod, PeriodStatus};

/// Close reason recorded on bills closed by the period ending
pub const PERIOD_TIMEOUT_REASON: &str = "Billing period timed out";

/// Payload of `create-bill`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBillSignal {
    pub bill_id: BillId,
    pub currency: Currency,
}

/// A charge as submitted, before conversion and accrual
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemPayload {
    pub id: LineItemId,
    pub description: String,
    pub amount: Decimal,
    pub quantity: u32,
    pub currency: Currency,
}

/// Payload of `add-line-item`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLineItemSignal {
    pub bill_id: BillId,
    pub line_item: LineItemPayload,
}

/// Payload of `close-bill`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseBillSignal {
    pub bill_id: BillId,
    pub reason: String,
}

/// The closed set of signals a billing period accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", content = "payload", rename_all = "kebab-case")]
pub enum BillingSignal {
    CreateBill(CreateBillSignal),
    AddLineItem(AddLineItemSignal),
    CloseBill(CloseBillSignal),
    CloseBillingPeriod,
}

impl BillingSignal {
    /// The wire name of the signal
    pub fn name(&self) -> &'static str {
        match self {
            BillingSignal::CreateBill(_) => "create-bill",
            BillingSignal::AddLineItem(_) => "add-line-item",
            BillingSignal::CloseBill(_) => "close-bill",
            BillingSignal::CloseBillingPeriod => "close-billing-period",
        }
    }

    /// The bill the signal targets, if any
    pub fn bill_id(&self) -> Option<BillId> {
        match self {
            BillingSignal::CreateBill(s) => Some(s.bill_id),
            BillingSignal::AddLineItem(s) => Some(s.bill_id),
            BillingSignal::CloseBill(s) => Some(s.bill_id),
            BillingSignal::CloseBillingPeriod => None,
        }
    }
}

/// What a handler did with a signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalOutcome {
    Applied,
    Ignored(BillingError),
}

impl SignalOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, SignalOutcome::Applied)
    }

    fn from_result(result: Result<(), BillingError>) -> Self {
        match result {
            Ok(()) => SignalOutcome::Applied,
            Err(e) => SignalOutcome::Ignored(e),
        }
    }
}

impl BillingPeriod {
    /// Dispatches a signal to its handler
    ///
    /// Once the period is Closed every signal is ignored.
    pub fn handle_signal(
        &mut self,
        signal: &BillingSignal,
        now: DateTime<Utc>,
        rules: &BillingRules,
    ) -> SignalOutcome {
        if !self.is_active() {
            let outcome = SignalOutcome::Ignored(BillingError::PeriodClosed(self.key().to_string()));
            warn!(
                customer_id = %self.customer_id,
                signal = signal.name(),
                "Signal received after billing period closed, ignoring"
            );
            return outcome;
        }

        let outcome = match signal {
            BillingSignal::CreateBill(s) => self.create_bill(s, now),
            BillingSignal::AddLineItem(s) => self.add_line_item(s, now, rules),
            BillingSignal::CloseBill(s) => self.close_bill(s, now),
            BillingSignal::CloseBillingPeriod => {
                self.close_period(now);
                SignalOutcome::Applied
            }
        };

        match &outcome {
            SignalOutcome::Ignored(reason) if reason.is_precondition_miss() => warn!(
                customer_id = %self.customer_id,
                signal = signal.name(),
                error = %reason,
                "Signal ignored"
            ),
            SignalOutcome::Ignored(reason) => error!(
                customer_id = %self.customer_id,
                signal = signal.name(),
                error = %reason,
                "Signal rejected"
            ),
            SignalOutcome::Applied => {}
        }
        outcome
    }

    /// Opens a new bill; a repeated id is ignored
    pub fn create_bill(&mut self, signal: &CreateBillSignal, now: DateTime<Utc>) -> SignalOutcome {
        let result = self
            .bills
            .insert(Bill::open(signal.bill_id, signal.currency, now));
        if result.is_ok() {
            info!(
                customer_id = %self.customer_id,
                bill_id = %signal.bill_id,
                currency = %signal.currency,
                "Bill created"
            );
        }
        SignalOutcome::from_result(result)
    }

    /// Converts the submitted charge into the bill currency, applies accrual
    /// and appends it to the bill
    pub fn add_line_item(
        &mut self,
        signal: &AddLineItemSignal,
        now: DateTime<Utc>,
        rules: &BillingRules,
    ) -> SignalOutcome {
        let started_at = self.started_at();
        let customer_id = self.customer_id.clone();
        let Some(bill) = self.bills.get_mut(signal.bill_id) else {
            return SignalOutcome::Ignored(BillingError::BillNotFound(signal.bill_id));
        };

        let payload = &signal.line_item;
        let factor = rules.accrual.factor(started_at, now);
        let amount = rules
            .converter
            .convert(payload.currency, bill.currency(), payload.amount)
            .and_then(|converted| Money::new(converted, bill.currency()).multiply(factor));
        let amount = match amount {
            Ok(amount) => amount,
            Err(source) => {
                return SignalOutcome::Ignored(BillingError::AmountOverflow {
                    bill_id: signal.bill_id,
                    source,
                })
            }
        };
        let item = LineItem {
            id: payload.id,
            description: payload.description.clone(),
            amount,
            quantity: payload.quantity,
            submitted: Money::new(payload.amount, payload.currency),
            accrual_factor: factor,
            added_at: now,
        };
        let amount = item.amount;

        let result = bill.add_line_item(item);
        if result.is_ok() {
            info!(
                customer_id = %customer_id,
                bill_id = %signal.bill_id,
                amount = %amount,
                quantity = payload.quantity,
                accrual_factor = %factor,
                new_total = %bill.total_amount(),
                "Line item added"
            );
        }
        SignalOutcome::from_result(result)
    }

    /// Closes a single open bill
    pub fn close_bill(&mut self, signal: &CloseBillSignal, now: DateTime<Utc>) -> SignalOutcome {
        let customer_id = self.customer_id.clone();
        let Some(bill) = self.bills.get_mut(signal.bill_id) else {
            return SignalOutcome::Ignored(BillingError::BillNotFound(signal.bill_id));
        };

        let result = bill.close(signal.reason.clone(), now);
        if result.is_ok() {
            info!(
                customer_id = %customer_id,
                bill_id = %signal.bill_id,
                reason = %signal.reason,
                total = %bill.total_amount(),
                "Bill closed"
            );
        }
        SignalOutcome::from_result(result)
    }

    /// Closes every open bill with `reason`, returning how many were closed
    pub fn close_all_open(&mut self, reason: &str, now: DateTime<Utc>) -> usize {
        let mut closed = 0;
        for bill in self.bills.iter_mut().filter(|b| b.is_open()) {
            match bill.close(reason, now) {
                Ok(()) => {
                    debug!(bill_id = %bill.id(), total = %bill.total_amount(), "Bill closed at period end");
                    closed += 1;
                }
                Err(e) => error!(bill_id = %bill.id(), error = %e, "Bill left open at period end"),
            }
        }
        closed
    }

    /// Ends the period: closes the remaining open bills and goes terminal
    ///
    /// Returns the number of bills closed; zero if the period was already Closed.
    pub fn close_period(&mut self, now: DateTime<Utc>) -> usize {
        if !self.is_active() {
            return 0;
        }
        let closed = self.close_all_open(PERIOD_TIMEOUT_REASON, now);
        self.status = PeriodStatus::Closed;
        self.closed_at = Some(now);
        info!(
            customer_id = %self.customer_id,
            bills_closed = closed,
            "Billing period closed"
        );
        closed
    }
}
