//! Custom Test Assertions
//!
//! Provides assertion helpers for billing types that give more meaningful
//! failure messages than comparing whole structs.

use core_kernel::Money;
use rust_decimal::Decimal;

use domain_billing::{Bill, BillStatus};

/// Asserts that two Money values are equal in currency and amount
pub fn assert_money_eq(actual: &Money, expected: &Money) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );
    assert_eq!(
        actual.amount(),
        expected.amount(),
        "Amount mismatch: actual={}, expected={}",
        actual,
        expected
    );
}

/// Asserts a bill's total equals Σ(amount × quantity) of its line items
pub fn assert_total_invariant(bill: &Bill) {
    let expected: Decimal = bill
        .line_items()
        .iter()
        .map(|item| item.amount.amount() * Decimal::from(item.quantity))
        .sum();
    assert_eq!(
        bill.total_amount().amount(),
        expected,
        "Bill {} total {} does not match its line items ({})",
        bill.id(),
        bill.total_amount(),
        expected
    );
}

/// Asserts a bill is Closed with the given reason and a close timestamp
pub fn assert_bill_closed(bill: &Bill, reason: &str) {
    assert_eq!(bill.status(), BillStatus::Closed, "Bill {} is not closed", bill.id());
    assert_eq!(
        bill.close_reason(),
        Some(reason),
        "Bill {} closed with unexpected reason",
        bill.id()
    );
    assert!(bill.closed_at().is_some(), "Bill {} has no close time", bill.id());
    assert_total_invariant(bill);
}

/// Asserts a bill is still Open with no close metadata
pub fn assert_bill_open(bill: &Bill) {
    assert_eq!(bill.status(), BillStatus::Open, "Bill {} is not open", bill.id());
    assert!(bill.closed_at().is_none());
    assert!(bill.close_reason().is_none());
}
