//! Billing Period Ports
//!
//! The `BillingPeriodPort` trait is how the request layer drives billing
//! period processes without knowing who hosts them.
//!
//! - **Process runtime adapter**: one tokio task per period (infra_runtime)
//! - **Mock adapter**: for testing the request layer in isolation
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_billing::ports::BillingPeriodPort;
//! use std::sync::Arc;
//!
//! pub struct BillingService {
//!     periods: Arc<dyn BillingPeriodPort>,
//! }
//!
//! impl BillingService {
//!     pub async fn open_bill(&self, customer: &CustomerId, bill_id: BillId) -> Result<(), PortError> {
//!         self.periods
//!             .signal(customer, BillingSignal::CreateBill(CreateBillSignal { bill_id, currency: Currency::USD }))
//!             .await
//!     }
//! }
//! ```

use async_trait::async_trait;

use core_kernel::{BillId, CustomerId, PortError};

use crate::bill::{Bill, BillStatus};
use crate::period::{BillingPeriodInput, PeriodSummary, ProcessKey};
use crate::queries::{BillingQuery, QueryResponse};
use crate::signals::BillingSignal;

/// Port for starting, signalling and querying billing period processes
///
/// Calls addressed by customer go to that customer's most recently started
/// period.
#[async_trait]
pub trait BillingPeriodPort: Send + Sync {
    /// Starts a new billing period process
    ///
    /// # Errors
    ///
    /// * `Validation` if the input does not describe a valid period
    /// * `Conflict` if the customer already has an Active period
    async fn start_period(&self, input: BillingPeriodInput) -> Result<ProcessKey, PortError>;

    /// Key of the customer's current period
    ///
    /// # Errors
    ///
    /// * `NotFound` if the customer has no period
    async fn current_period(&self, customer_id: &CustomerId) -> Result<ProcessKey, PortError>;

    /// Delivers a signal; the call returns once the signal is queued
    ///
    /// # Errors
    ///
    /// * `NotFound` if the customer has no period
    /// * `ServiceUnavailable` if the process is no longer accepting commands
    async fn signal(&self, customer_id: &CustomerId, signal: BillingSignal) -> Result<(), PortError>;

    /// Runs a query, ordered after every signal already sent
    async fn query(
        &self,
        customer_id: &CustomerId,
        query: BillingQuery,
    ) -> Result<QueryResponse, PortError>;

    /// Closes the customer's period and returns its settlement
    async fn close_period(&self, customer_id: &CustomerId) -> Result<PeriodSummary, PortError>;

    /// Forgets the customer's period
    async fn release(&self, customer_id: &CustomerId) -> Result<(), PortError>;

    /// Fetches one bill
    async fn get_bill(&self, customer_id: &CustomerId, bill_id: BillId) -> Result<Bill, PortError> {
        match self
            .query(customer_id, BillingQuery::GetBill { bill_id })
            .await?
        {
            QueryResponse::Bill(bill) => Ok(bill),
            QueryResponse::NotFound(id) => Err(PortError::not_found("Bill", id)),
            QueryResponse::Bills(_) => Err(PortError::internal("unexpected response to get-bill")),
        }
    }

    /// Lists bills, optionally filtered by status
    async fn list_bills(
        &self,
        customer_id: &CustomerId,
        status: Option<BillStatus>,
    ) -> Result<Vec<Bill>, PortError> {
        match self
            .query(customer_id, BillingQuery::ListBills { status })
            .await?
        {
            QueryResponse::Bills(bills) => Ok(bills),
            _ => Err(PortError::internal("unexpected response to list-bills")),
        }
    }
}
