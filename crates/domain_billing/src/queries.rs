//! Read-only queries over a billing period

use serde::{Deserialize, Serialize};

use core_kernel::BillId;

use crate::bill::{Bill, BillStatus};
use crate::error::BillingError;
use crate::period::BillingPeriod;

/// The closed set of queries a billing period answers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "query", content = "payload", rename_all = "kebab-case")]
pub enum BillingQuery {
    GetBill { bill_id: BillId },
    /// `None` lists every bill
    ListBills { status: Option<BillStatus> },
}

impl BillingQuery {
    pub fn name(&self) -> &'static str {
        match self {
            BillingQuery::GetBill { .. } => "get-bill",
            BillingQuery::ListBills { .. } => "list-bills",
        }
    }
}

/// Answer to a [`BillingQuery`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryResponse {
    Bill(Bill),
    Bills(Vec<Bill>),
    NotFound(BillId),
}

impl BillingPeriod {
    /// Snapshot of one bill
    pub fn get_bill(&self, bill_id: BillId) -> Result<Bill, BillingError> {
        self.bills
            .get(bill_id)
            .cloned()
            .ok_or(BillingError::BillNotFound(bill_id))
    }

    /// Bills matching `status` (all bills for `None`), in creation order
    pub fn list_bills(&self, status: Option<BillStatus>) -> Vec<Bill> {
        match status {
            Some(status) => self.bills.with_status(status).cloned().collect(),
            None => self.bills.iter().cloned().collect(),
        }
    }

    /// Answers a query without mutating the period
    pub fn answer(&self, query: &BillingQuery) -> QueryResponse {
        match query {
            BillingQuery::GetBill { bill_id } => match self.get_bill(*bill_id) {
                Ok(bill) => QueryResponse::Bill(bill),
                Err(_) => QueryResponse::NotFound(*bill_id),
            },
            BillingQuery::ListBills { status } => QueryResponse::Bills(self.list_bills(*status)),
        }
    }
}
