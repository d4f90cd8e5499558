//! Billing period state
//!
//! A [`BillingPeriod`] is the durable state of one customer's period: the
//! window it runs over, its status and its bills. All mutation goes through
//! the signal handlers in [`crate::signals`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{BillingWindow, Currency, CurrencyConverter, CustomerId, Money};

use crate::bill::{Bill, BillStatus};
use crate::error::BillingError;
use crate::store::BillingPeriodStore;

/// Period status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PeriodStatus {
    /// Accepting signals
    Active,
    /// Terminal
    Closed,
}

/// Input needed to start a billing period process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriodInput {
    pub customer_id: CustomerId,
    pub currency: Currency,
    pub billing_period_days: u32,
    pub started_at: DateTime<Utc>,
}

impl BillingPeriodInput {
    pub fn new(
        customer_id: CustomerId,
        currency: Currency,
        billing_period_days: u32,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            customer_id,
            currency,
            billing_period_days,
            started_at,
        }
    }

    /// Validates the input and derives the period window
    pub fn window(&self) -> Result<BillingWindow, BillingError> {
        if !self.currency.is_billable() {
            return Err(BillingError::InvalidPeriod(format!(
                "currency {} is not billable",
                self.currency
            )));
        }
        BillingWindow::new(self.started_at, self.billing_period_days)
            .map_err(|e| BillingError::InvalidPeriod(e.to_string()))
    }

    /// The key the process for this input is registered under
    pub fn key(&self) -> ProcessKey {
        ProcessKey::new(self.customer_id.clone(), self.started_at.date_naive())
    }
}

/// Identifies one billing period process: a customer and the day it started
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessKey {
    pub customer_id: CustomerId,
    pub period_start: NaiveDate,
}

impl ProcessKey {
    pub fn new(customer_id: CustomerId, period_start: NaiveDate) -> Self {
        Self {
            customer_id,
            period_start,
        }
    }
}

impl fmt::Display for ProcessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "billing-period-{}-{}",
            self.period_start.format("%Y%m%d"),
            self.customer_id
        )
    }
}

/// The state of one customer's billing period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub(crate) customer_id: CustomerId,
    pub(crate) currency: Currency,
    pub(crate) window: BillingWindow,
    pub(crate) status: PeriodStatus,
    pub(crate) bills: BillingPeriodStore,
    pub(crate) closed_at: Option<DateTime<Utc>>,
}

impl BillingPeriod {
    /// Creates an Active period with no bills
    pub fn new(input: &BillingPeriodInput) -> Result<Self, BillingError> {
        let window = input.window()?;
        Ok(Self {
            customer_id: input.customer_id.clone(),
            currency: input.currency,
            window,
            status: PeriodStatus::Active,
            bills: BillingPeriodStore::new(),
            closed_at: None,
        })
    }

    pub fn customer_id(&self) -> &CustomerId {
        &self.customer_id
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn window(&self) -> &BillingWindow {
        &self.window
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.window.started_at()
    }

    pub fn status(&self) -> PeriodStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == PeriodStatus::Active
    }

    pub fn bills(&self) -> &BillingPeriodStore {
        &self.bills
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    pub fn key(&self) -> ProcessKey {
        ProcessKey::new(self.customer_id.clone(), self.window.start_date())
    }

    /// Settlement view over the closed bills, normalised to USD and GEL
    ///
    /// # Errors
    ///
    /// Returns `SettlementOverflow` if the converted totals leave the decimal range.
    pub fn summary(&self, converter: &CurrencyConverter) -> Result<PeriodSummary, BillingError> {
        let bills: Vec<Bill> = self.bills.with_status(BillStatus::Closed).cloned().collect();
        let usd = bills
            .iter()
            .try_fold(Money::zero(Currency::USD), |acc, bill| {
                converter
                    .convert_money(&bill.total_amount(), Currency::USD)
                    .and_then(|total| acc.checked_add(&total))
            })
            .map_err(BillingError::SettlementOverflow)?;
        let gel = converter
            .convert_money(&usd, Currency::GEL)
            .map_err(BillingError::SettlementOverflow)?;

        Ok(PeriodSummary {
            customer_id: self.customer_id.clone(),
            status: self.status,
            bills,
            final_amount_usd: usd,
            final_amount_gel: gel,
        })
    }
}

/// Final amounts of a period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub customer_id: CustomerId,
    pub status: PeriodStatus,
    pub bills: Vec<Bill>,
    pub final_amount_usd: Money,
    pub final_amount_gel: Money,
}
