//! Test Data Builders
//!
//! Builders for signals and period inputs. Tests set only the fields they
//! care about and take defaults for the rest.

use chrono::{DateTime, Utc};
use core_kernel::{BillId, Currency, CustomerId, LineItemId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use domain_billing::{
    AddLineItemSignal, BillingPeriodInput, BillingSignal, CloseBillSignal, CreateBillSignal,
    LineItemPayload,
};

use crate::fixtures::{CustomerFixtures, TemporalFixtures};

/// Builder for billing period inputs
pub struct TestPeriodInputBuilder {
    customer_id: CustomerId,
    currency: Currency,
    days: u32,
    started_at: DateTime<Utc>,
}

impl Default for TestPeriodInputBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestPeriodInputBuilder {
    /// Creates a new builder with default values
    pub fn new() -> Self {
        Self {
            customer_id: CustomerFixtures::standard(),
            currency: Currency::USD,
            days: 30,
            started_at: TemporalFixtures::period_start(),
        }
    }

    pub fn with_customer(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = customer_id;
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    pub fn starting_at(mut self, at: DateTime<Utc>) -> Self {
        self.started_at = at;
        self
    }

    pub fn build(self) -> BillingPeriodInput {
        BillingPeriodInput::new(self.customer_id, self.currency, self.days, self.started_at)
    }
}

/// Builder for `add-line-item` signals
pub struct TestLineItemBuilder {
    bill_id: BillId,
    description: String,
    amount: Decimal,
    quantity: u32,
    currency: Currency,
}

impl TestLineItemBuilder {
    /// A single 100 USD charge on `bill_id`
    pub fn new(bill_id: BillId) -> Self {
        Self {
            bill_id,
            description: "Test".to_string(),
            amount: dec!(100),
            quantity: 1,
            currency: Currency::USD,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn amount(mut self, amount: Decimal) -> Self {
        self.amount = amount;
        self
    }

    pub fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn build(self) -> BillingSignal {
        BillingSignal::AddLineItem(AddLineItemSignal {
            bill_id: self.bill_id,
            line_item: LineItemPayload {
                id: LineItemId::new(),
                description: self.description,
                amount: self.amount,
                quantity: self.quantity,
                currency: self.currency,
            },
        })
    }
}

/// Shorthand constructors for the remaining signals
pub struct Signals;

impl Signals {
    pub fn create_bill(bill_id: BillId, currency: Currency) -> BillingSignal {
        BillingSignal::CreateBill(CreateBillSignal { bill_id, currency })
    }

    pub fn close_bill(bill_id: BillId, reason: impl Into<String>) -> BillingSignal {
        BillingSignal::CloseBill(CloseBillSignal {
            bill_id,
            reason: reason.into(),
        })
    }

    pub fn close_period() -> BillingSignal {
        BillingSignal::CloseBillingPeriod
    }
}
