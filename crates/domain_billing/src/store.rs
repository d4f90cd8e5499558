//! Ordered bill collection for one billing period

use serde::{Deserialize, Serialize};

use core_kernel::BillId;

use crate::bill::{Bill, BillStatus};
use crate::error::BillingError;

/// The bills of a single period, in creation order
///
/// Lookups are linear; a period holds a handful of bills and insertion order
/// is what listing reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BillingPeriodStore {
    bills: Vec<Bill>,
}

impl BillingPeriodStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a bill, rejecting an id that is already present
    pub fn insert(&mut self, bill: Bill) -> Result<(), BillingError> {
        if self.contains(bill.id()) {
            return Err(BillingError::DuplicateBill(bill.id()));
        }
        self.bills.push(bill);
        Ok(())
    }

    pub fn contains(&self, id: BillId) -> bool {
        self.bills.iter().any(|b| b.id() == id)
    }

    pub fn get(&self, id: BillId) -> Option<&Bill> {
        self.bills.iter().find(|b| b.id() == id)
    }

    pub fn get_mut(&mut self, id: BillId) -> Option<&mut Bill> {
        self.bills.iter_mut().find(|b| b.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bill> {
        self.bills.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Bill> {
        self.bills.iter_mut()
    }

    /// Bills whose status equals `status`, in creation order
    pub fn with_status(&self, status: BillStatus) -> impl Iterator<Item = &Bill> {
        self.bills.iter().filter(move |b| b.status() == status)
    }

    pub fn len(&self) -> usize {
        self.bills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bills.is_empty()
    }
}
