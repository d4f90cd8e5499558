//! Billing Domain - Customer Billing Periods
//!
//! This crate holds the per-customer billing period: a long-lived process
//! that owns a set of bills, reacts to signals and a deadline timer, and
//! answers read-only queries.
//!
//! # Components
//!
//! - **Bill / LineItem**: single-currency bills with monotonic Open → Closed status
//! - **AccrualCalculator**: 2.5× penalty on charges added more than 24h into the period
//! - **BillingPeriodStore**: bills in creation order, unique by id
//! - **Signal handlers**: create-bill, add-line-item, close-bill, close-billing-period
//! - **Query handlers**: get-bill, list-bills
//! - **BillingPeriodProcess**: deterministic stepping state machine with replay
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_billing::{BillingPeriodProcess, BillingPeriodInput, ProcessEvent, BillingSignal};
//!
//! let mut process = BillingPeriodProcess::start(&input)?;
//! process.step(&ProcessEvent::Signal(BillingSignal::CreateBill(create)), now);
//! process.step(&ProcessEvent::TimerFired, process.deadline());
//! assert!(process.is_terminated());
//! ```

pub mod accrual;
pub mod bill;
pub mod error;
pub mod period;
pub mod ports;
pub mod process;
pub mod queries;
pub mod signals;
pub mod store;

pub use accrual::{AccrualCalculator, BillingRules};
pub use bill::{Bill, BillStatus, LineItem, UnknownBillStatus};
pub use error::BillingError;
pub use period::{BillingPeriod, BillingPeriodInput, PeriodStatus, PeriodSummary, ProcessKey};
pub use ports::BillingPeriodPort;
pub use process::{BillingPeriodProcess, ProcessEvent, RecordedEvent, StepOutcome};
pub use queries::{BillingQuery, QueryResponse};
pub use signals::{
    AddLineItemSignal, BillingSignal, CloseBillSignal, CreateBillSignal, LineItemPayload,
    SignalOutcome, PERIOD_TIMEOUT_REASON,
};
pub use store::BillingPeriodStore;
