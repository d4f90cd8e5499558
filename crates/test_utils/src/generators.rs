//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating signal sequences that stay
//! within what the request layer would let through.

use chrono::Duration;
use core_kernel::{BillId, Currency};
use proptest::prelude::*;
use rust_decimal::Decimal;

use domain_billing::BillingSignal;

use crate::builders::{Signals, TestLineItemBuilder};

/// Strategy for billable currencies
pub fn billable_currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![Just(Currency::USD), Just(Currency::GEL)]
}

/// Strategy for any currency, billable or not
pub fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::USD),
        Just(Currency::GEL),
        Just(Currency::EUR),
        Just(Currency::GBP),
        Just(Currency::JPY),
        Just(Currency::CHF),
    ]
}

/// Non-negative amounts with two decimal places
pub fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Positive quantities
pub fn quantity_strategy() -> impl Strategy<Value = u32> {
    1u32..100
}

/// Offsets from the period start, spanning the accrual boundary
pub fn offset_strategy() -> impl Strategy<Value = Duration> {
    (0i64..72 * 60).prop_map(Duration::minutes)
}

/// A signal against one of `bills`, or a bill id that was never created
///
/// `bills` must not be empty.
pub fn signal_strategy(bills: Vec<BillId>) -> impl Strategy<Value = BillingSignal> {
    let target = prop_oneof![
        4 => proptest::sample::select(bills),
        1 => Just(()).prop_map(|_| BillId::new()),
    ];
    (
        target,
        0u8..3,
        amount_strategy(),
        quantity_strategy(),
        billable_currency_strategy(),
    )
        .prop_map(|(bill_id, kind, amount, quantity, currency)| match kind {
            0 => Signals::create_bill(bill_id, currency),
            1 => TestLineItemBuilder::new(bill_id)
                .amount(amount)
                .quantity(quantity)
                .currency(currency)
                .build(),
            _ => Signals::close_bill(bill_id, "generated"),
        })
}
