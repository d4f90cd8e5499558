//! Comprehensive tests for domain_billing

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{BillId, Currency, CustomerId, LineItemId};

use domain_billing::{
    AccrualCalculator, AddLineItemSignal, BillStatus, BillingError, BillingPeriodInput,
    BillingPeriodProcess, BillingQuery, BillingRules, BillingSignal, CloseBillSignal,
    CreateBillSignal, LineItemPayload, PeriodStatus, ProcessEvent, QueryResponse, RecordedEvent,
    SignalOutcome, StepOutcome, PERIOD_TIMEOUT_REASON,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 21, 7, 0, 0).unwrap()
}

fn input(days: u32) -> BillingPeriodInput {
    BillingPeriodInput::new(CustomerId::new("customer-c").unwrap(), Currency::USD, days, t0())
}

fn create(bill_id: BillId, currency: Currency) -> ProcessEvent {
    ProcessEvent::Signal(BillingSignal::CreateBill(CreateBillSignal { bill_id, currency }))
}

fn add(bill_id: BillId, amount: Decimal, quantity: u32, currency: Currency) -> ProcessEvent {
    ProcessEvent::Signal(BillingSignal::AddLineItem(AddLineItemSignal {
        bill_id,
        line_item: LineItemPayload {
            id: LineItemId::new(),
            description: "Test".to_string(),
            amount,
            quantity,
            currency,
        },
    }))
}

fn close(bill_id: BillId, reason: &str) -> ProcessEvent {
    ProcessEvent::Signal(BillingSignal::CloseBill(CloseBillSignal {
        bill_id,
        reason: reason.to_string(),
    }))
}

fn close_period() -> ProcessEvent {
    ProcessEvent::Signal(BillingSignal::CloseBillingPeriod)
}

fn started() -> BillingPeriodProcess {
    BillingPeriodProcess::start(&input(30)).unwrap()
}

// ============================================================================
// Accrual Tests
// ============================================================================

mod accrual_tests {
    use super::*;

    #[test]
    fn test_factor_before_boundary() {
        let calc = AccrualCalculator::standard();
        let at = t0() + Duration::hours(23) + Duration::minutes(59);
        assert_eq!(calc.factor(t0(), at), dec!(1));
    }

    #[test]
    fn test_factor_at_boundary() {
        let calc = AccrualCalculator::standard();
        assert_eq!(calc.factor(t0(), t0() + Duration::hours(24)), dec!(1));
    }

    #[test]
    fn test_factor_after_boundary() {
        let calc = AccrualCalculator::standard();
        let at = t0() + Duration::hours(24) + Duration::milliseconds(1);
        assert_eq!(calc.factor(t0(), at), dec!(2.5));
    }
}

// ============================================================================
// Signal Handler Tests
// ============================================================================

mod signal_tests {
    use super::*;

    #[test]
    fn test_create_bill_starts_open_and_empty() {
        let mut process = started();
        let bill_id = BillId::new();
        process.step(&create(bill_id, Currency::USD), t0() + Duration::minutes(5));

        let bill = process.period().get_bill(bill_id).unwrap();
        assert_eq!(bill.status(), BillStatus::Open);
        assert!(bill.total_amount().is_zero());
        assert!(bill.line_items().is_empty());
        assert_eq!(bill.created_at(), t0() + Duration::minutes(5));
        assert!(bill.closed_at().is_none());
        assert!(bill.close_reason().is_none());
    }

    #[test]
    fn test_duplicate_create_bill_ignored() {
        let mut process = started();
        let bill_id = BillId::new();
        process.step(&create(bill_id, Currency::USD), t0());
        let outcome = process.step(&create(bill_id, Currency::GEL), t0());

        assert_eq!(
            outcome,
            StepOutcome::Active(SignalOutcome::Ignored(BillingError::DuplicateBill(bill_id)))
        );
        assert_eq!(process.period().bills().len(), 1);
        assert_eq!(process.period().get_bill(bill_id).unwrap().currency(), Currency::USD);
    }

    #[test]
    fn test_add_line_item_to_missing_bill_is_noop() {
        let mut process = started();
        let before = process.period().clone();
        let missing = BillId::new();

        let outcome = process.step(&add(missing, dec!(10), 1, Currency::USD), t0());

        assert_eq!(
            outcome,
            StepOutcome::Active(SignalOutcome::Ignored(BillingError::BillNotFound(missing)))
        );
        assert_eq!(process.period(), &before);
    }

    #[test]
    fn test_add_line_item_to_closed_bill_ignored() {
        let mut process = started();
        let bill_id = BillId::new();
        process.step(&create(bill_id, Currency::USD), t0());
        process.step(&add(bill_id, dec!(10), 1, Currency::USD), t0());
        process.step(&close(bill_id, "paid"), t0());

        let outcome = process.step(&add(bill_id, dec!(5), 1, Currency::USD), t0());

        assert_eq!(
            outcome,
            StepOutcome::Active(SignalOutcome::Ignored(BillingError::BillClosed(bill_id)))
        );
        let bill = process.period().get_bill(bill_id).unwrap();
        assert_eq!(bill.line_items().len(), 1);
        assert_eq!(bill.total_amount().amount(), dec!(10));
    }

    #[test]
    fn test_add_line_item_converts_into_bill_currency() {
        let mut process = started();
        let bill_id = BillId::new();
        process.step(&create(bill_id, Currency::GEL), t0());
        process.step(&add(bill_id, dec!(100), 1, Currency::USD), t0() + Duration::hours(1));

        let bill = process.period().get_bill(bill_id).unwrap();
        let item = &bill.line_items()[0];
        assert_eq!(item.amount.amount(), dec!(250));
        assert_eq!(item.amount.currency(), Currency::GEL);
        assert_eq!(item.submitted.amount(), dec!(100));
        assert_eq!(item.submitted.currency(), Currency::USD);
        assert_eq!(item.accrual_factor, dec!(1));
    }

    #[test]
    fn test_running_total_uses_quantity() {
        let mut process = started();
        let bill_id = BillId::new();
        process.step(&create(bill_id, Currency::USD), t0());
        process.step(&add(bill_id, dec!(12.5), 4, Currency::USD), t0());

        let bill = process.period().get_bill(bill_id).unwrap();
        assert_eq!(bill.total_amount().amount(), dec!(50));
        assert_eq!(bill.total_amount(), bill.calculate_total().unwrap());
    }

    #[test]
    fn test_close_bill_sets_reason_and_time() {
        let mut process = started();
        let bill_id = BillId::new();
        let at = t0() + Duration::hours(2);
        process.step(&create(bill_id, Currency::USD), t0());
        process.step(&add(bill_id, dec!(3), 3, Currency::USD), t0());
        process.step(&close(bill_id, "Customer request"), at);

        let bill = process.period().get_bill(bill_id).unwrap();
        assert_eq!(bill.status(), BillStatus::Closed);
        assert_eq!(bill.closed_at(), Some(at));
        assert_eq!(bill.close_reason(), Some("Customer request"));
        assert_eq!(bill.total_amount().amount(), dec!(9));
    }

    #[test]
    fn test_close_bill_twice_changes_nothing() {
        let mut process = started();
        let bill_id = BillId::new();
        process.step(&create(bill_id, Currency::USD), t0());
        process.step(&add(bill_id, dec!(7), 2, Currency::USD), t0());
        process.step(&close(bill_id, "first"), t0() + Duration::hours(1));
        let first = process.period().get_bill(bill_id).unwrap();

        let outcome = process.step(&close(bill_id, "second"), t0() + Duration::hours(2));

        assert_eq!(
            outcome,
            StepOutcome::Active(SignalOutcome::Ignored(BillingError::BillClosed(bill_id)))
        );
        assert_eq!(process.period().get_bill(bill_id).unwrap(), first);
    }

    #[test]
    fn test_close_missing_bill_is_noop() {
        let mut process = started();
        let missing = BillId::new();
        let outcome = process.step(&close(missing, "x"), t0());
        assert_eq!(
            outcome,
            StepOutcome::Active(SignalOutcome::Ignored(BillingError::BillNotFound(missing)))
        );
    }

    #[test]
    fn test_line_item_too_large_for_bill_currency_is_ignored() {
        let mut process = started();
        let bill_id = BillId::new();
        process.step(&create(bill_id, Currency::GEL), t0());

        let outcome = process.step(
            &add(bill_id, Decimal::MAX / dec!(2), 1, Currency::USD),
            t0() + Duration::hours(1),
        );

        assert!(matches!(
            outcome,
            StepOutcome::Active(SignalOutcome::Ignored(BillingError::AmountOverflow { bill_id: id, .. }))
                if id == bill_id
        ));
        let bill = process.period().get_bill(bill_id).unwrap();
        assert!(bill.line_items().is_empty());
        assert_eq!(bill.total_amount().amount(), Decimal::ZERO);

        // the process keeps accepting signals
        process.step(&add(bill_id, dec!(4), 1, Currency::GEL), t0() + Duration::hours(2));
        assert_eq!(process.period().get_bill(bill_id).unwrap().total_amount().amount(), dec!(4));
    }

    #[test]
    fn test_running_total_overflow_is_ignored() {
        let mut process = started();
        let bill_id = BillId::new();
        let big = Decimal::MAX / dec!(2);
        process.step(&create(bill_id, Currency::USD), t0());
        process.step(&add(bill_id, big, 1, Currency::USD), t0());

        let outcome = process.step(&add(bill_id, big, 2, Currency::USD), t0());

        assert!(matches!(
            outcome,
            StepOutcome::Active(SignalOutcome::Ignored(BillingError::AmountOverflow { .. }))
        ));
        assert_eq!(process.period().get_bill(bill_id).unwrap().line_items().len(), 1);
    }
}

// ============================================================================
// Query Tests
// ============================================================================

mod query_tests {
    use super::*;

    fn three_bills() -> (BillingPeriodProcess, Vec<BillId>) {
        let mut process = started();
        let ids: Vec<BillId> = (0..3).map(|_| BillId::new()).collect();
        for (i, id) in ids.iter().enumerate() {
            process.step(&create(*id, Currency::USD), t0() + Duration::minutes(i as i64));
        }
        (process, ids)
    }

    fn ids_of(response: QueryResponse) -> Vec<BillId> {
        match response {
            QueryResponse::Bills(bills) => bills.iter().map(|b| b.id()).collect(),
            other => panic!("expected bills, got {other:?}"),
        }
    }

    #[test]
    fn test_list_preserves_creation_order() {
        let (mut process, ids) = three_bills();
        process.step(&close(ids[0], "done"), t0());

        let closed = process.query(&BillingQuery::ListBills { status: Some(BillStatus::Closed) });
        let open = process.query(&BillingQuery::ListBills { status: Some(BillStatus::Open) });

        assert_eq!(ids_of(closed), vec![ids[0]]);
        assert_eq!(ids_of(open), vec![ids[1], ids[2]]);
    }

    #[test]
    fn test_list_without_status_returns_all() {
        let (process, ids) = three_bills();
        let all = process.query(&BillingQuery::ListBills { status: None });
        assert_eq!(ids_of(all), ids);
    }

    #[test]
    fn test_get_unknown_bill_is_not_found() {
        let process = started();
        let missing = BillId::new();
        assert_eq!(
            process.query(&BillingQuery::GetBill { bill_id: missing }),
            QueryResponse::NotFound(missing)
        );
    }

    #[test]
    fn test_queries_do_not_mutate() {
        let (process, ids) = three_bills();
        let before = process.period().clone();
        process.query(&BillingQuery::GetBill { bill_id: ids[1] });
        process.query(&BillingQuery::ListBills { status: None });
        assert_eq!(process.period(), &before);
    }
}

// ============================================================================
// Process Tests
// ============================================================================

mod process_tests {
    use super::*;

    #[test]
    fn test_close_period_end_to_end() {
        let mut process = started();
        let b1 = BillId::new();
        process.step(&create(b1, Currency::USD), t0());
        process.step(&add(b1, dec!(100), 1, Currency::USD), t0() + Duration::hours(1));

        let outcome = process.step(&close_period(), t0() + Duration::hours(2));

        assert_eq!(outcome, StepOutcome::Closed { bills_closed: 1 });
        assert!(process.is_terminated());
        assert_eq!(process.period().status(), PeriodStatus::Closed);
        let bill = process.period().get_bill(b1).unwrap();
        assert_eq!(bill.status(), BillStatus::Closed);
        assert_eq!(bill.total_amount().amount(), dec!(100));
        assert_eq!(bill.close_reason(), Some(PERIOD_TIMEOUT_REASON));
    }

    #[test]
    fn test_cross_currency_end_to_end() {
        let mut process = started();
        let b1 = BillId::new();
        process.step(&create(b1, Currency::USD), t0());
        process.step(&add(b1, dec!(250), 10, Currency::GEL), t0() + Duration::hours(3));

        let bill = process.period().get_bill(b1).unwrap();
        assert_eq!(bill.line_items()[0].amount.amount(), dec!(100));

        process.step(&close_period(), t0() + Duration::hours(4));
        let bill = process.period().get_bill(b1).unwrap();
        assert_eq!(bill.total_amount().amount(), dec!(1000));
    }

    #[test]
    fn test_timer_closes_like_close_period() {
        let mut process = started();
        let open = BillId::new();
        let paid = BillId::new();
        process.step(&create(open, Currency::USD), t0());
        process.step(&create(paid, Currency::USD), t0());
        process.step(&close(paid, "paid"), t0());

        let deadline = process.deadline();
        let outcome = process.step(&ProcessEvent::TimerFired, deadline);

        assert_eq!(outcome, StepOutcome::Closed { bills_closed: 1 });
        assert_eq!(deadline, t0() + Duration::days(30));
        let open_bill = process.period().get_bill(open).unwrap();
        assert_eq!(open_bill.close_reason(), Some(PERIOD_TIMEOUT_REASON));
        assert_eq!(open_bill.closed_at(), Some(deadline));
        assert_eq!(process.period().get_bill(paid).unwrap().close_reason(), Some("paid"));
    }

    #[test]
    fn test_events_after_close_are_dropped() {
        let mut process = started();
        let b1 = BillId::new();
        process.step(&create(b1, Currency::USD), t0());
        process.step(&close_period(), t0());
        let frozen = process.period().clone();

        assert_eq!(process.step(&create(BillId::new(), Currency::USD), t0()), StepOutcome::AlreadyClosed);
        assert_eq!(process.step(&ProcessEvent::TimerFired, process.deadline()), StepOutcome::AlreadyClosed);
        assert_eq!(process.period(), &frozen);
        assert_eq!(process.events_handled(), 2);
    }

    #[test]
    fn test_queries_still_answered_after_close() {
        let mut process = started();
        let b1 = BillId::new();
        process.step(&create(b1, Currency::USD), t0());
        process.step(&close_period(), t0());

        assert!(matches!(
            process.query(&BillingQuery::GetBill { bill_id: b1 }),
            QueryResponse::Bill(_)
        ));
    }

    #[test]
    fn test_replay_rebuilds_identical_state() {
        let b1 = BillId::new();
        let b2 = BillId::new();
        let history = vec![
            RecordedEvent::new(1, t0(), create(b1, Currency::USD)),
            RecordedEvent::new(2, t0() + Duration::hours(1), add(b1, dec!(10), 2, Currency::USD)),
            RecordedEvent::new(3, t0() + Duration::hours(2), create(b2, Currency::GEL)),
            RecordedEvent::new(4, t0() + Duration::hours(30), add(b2, dec!(4), 1, Currency::USD)),
            RecordedEvent::new(5, t0() + Duration::hours(31), close(b1, "paid")),
        ];

        let mut live = started();
        for recorded in &history {
            live.step(&recorded.event, recorded.at);
        }
        let replayed =
            BillingPeriodProcess::replay(&input(30), BillingRules::default(), &history).unwrap();

        assert_eq!(replayed.period(), live.period());
        assert_eq!(replayed.events_handled(), live.events_handled());
        // 4 USD -> 10 GEL, then 2.5x accrual after the first day
        let b2_bill = replayed.period().get_bill(b2).unwrap();
        assert_eq!(b2_bill.total_amount().amount(), dec!(25));
    }

    #[test]
    fn test_invalid_input_rejected() {
        assert!(matches!(
            BillingPeriodProcess::start(&input(0)),
            Err(BillingError::InvalidPeriod(_))
        ));
    }

    #[test]
    fn test_summary_normalises_to_usd_and_gel() {
        let mut process = started();
        let usd = BillId::new();
        let gel = BillId::new();
        process.step(&create(usd, Currency::USD), t0());
        process.step(&create(gel, Currency::GEL), t0());
        process.step(&add(usd, dec!(40), 1, Currency::USD), t0());
        process.step(&add(gel, dec!(100), 1, Currency::GEL), t0());
        process.step(&close_period(), t0());

        let summary = process.summary().unwrap();
        assert_eq!(summary.bills.len(), 2);
        assert_eq!(summary.final_amount_usd.amount(), dec!(80));
        assert_eq!(summary.final_amount_gel.amount(), dec!(200));
    }

    #[test]
    fn test_summary_overflow_is_an_error() {
        let mut process = started();
        let bill_id = BillId::new();
        process.step(&create(bill_id, Currency::USD), t0());
        process.step(&add(bill_id, Decimal::MAX / dec!(2), 1, Currency::USD), t0());
        process.step(&close_period(), t0());

        assert!(matches!(process.summary(), Err(BillingError::SettlementOverflow(_))));
    }

    #[test]
    fn test_recorded_event_serde() {
        let event = RecordedEvent::new(7, t0(), close_period());
        let json = serde_json::to_string(&event).unwrap();
        let back: RecordedEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn item_strategy() -> impl Strategy<Value = (Decimal, u32, bool, i64)> {
        (
            (0i64..1_000_000).prop_map(|cents| Decimal::new(cents, 2)),
            1u32..50,
            any::<bool>(),
            0i64..72,
        )
    }

    proptest! {
        #[test]
        fn closed_total_is_sum_of_amount_times_quantity(
            items in prop::collection::vec(item_strategy(), 0..12)
        ) {
            let mut process = started();
            let bill_id = BillId::new();
            process.step(&create(bill_id, Currency::USD), t0());
            for (amount, quantity, gel, hours) in &items {
                let currency = if *gel { Currency::GEL } else { Currency::USD };
                process.step(&add(bill_id, *amount, *quantity, currency), t0() + Duration::hours(*hours));
            }
            process.step(&close(bill_id, "done"), t0() + Duration::hours(80));

            let bill = process.period().get_bill(bill_id).unwrap();
            let expected: Decimal = bill
                .line_items()
                .iter()
                .map(|i| i.amount.amount() * Decimal::from(i.quantity))
                .sum();
            prop_assert_eq!(bill.total_amount().amount(), expected);
            prop_assert_eq!(bill.line_items().len(), items.len());
        }

        #[test]
        fn close_bill_is_idempotent(
            items in prop::collection::vec(item_strategy(), 0..6),
            repeats in 1usize..5
        ) {
            let mut process = started();
            let bill_id = BillId::new();
            process.step(&create(bill_id, Currency::USD), t0());
            for (amount, quantity, _, hours) in &items {
                process.step(&add(bill_id, *amount, *quantity, Currency::USD), t0() + Duration::hours(*hours));
            }
            process.step(&close(bill_id, "first"), t0() + Duration::hours(100));
            let closed = process.period().get_bill(bill_id).unwrap();

            for n in 0..repeats {
                process.step(&close(bill_id, "again"), t0() + Duration::hours(101 + n as i64));
            }
            prop_assert_eq!(process.period().get_bill(bill_id).unwrap(), closed);
        }
    }
}
