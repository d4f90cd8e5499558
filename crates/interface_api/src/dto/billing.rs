//! Billing period DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use core_kernel::Currency;
use domain_billing::{Bill, BillStatus, LineItem, PeriodSummary};

/// Rejects currencies other than the billable ones
fn validate_billable_currency(code: &str) -> Result<(), ValidationError> {
    match code.parse::<Currency>() {
        Ok(currency) if currency.is_billable() => Ok(()),
        _ => {
            let mut error = ValidationError::new("currency");
            error.message = Some(format!("unsupported currency: {code} (supported: USD, GEL)").into());
            Err(error)
        }
    }
}

/// Largest amount a single line item may carry
pub const MAX_LINE_ITEM_AMOUNT: i64 = 1_000_000_000_000;

fn validate_line_item_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        let mut error = ValidationError::new("amount");
        error.message = Some("amount must not be negative".into());
        return Err(error);
    }
    if *amount > Decimal::from(MAX_LINE_ITEM_AMOUNT) {
        let mut error = ValidationError::new("amount");
        error.message = Some(format!("amount must not exceed {MAX_LINE_ITEM_AMOUNT}").into());
        return Err(error);
    }
    Ok(())
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("must not be blank".into());
        return Err(error);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct StartBillingPeriodRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub customer_id: String,
    #[validate(custom(function = "validate_billable_currency"))]
    pub currency: String,
    #[validate(range(min = 1, max = 3660, message = "billing_period_days must be between 1 and 3660"))]
    pub billing_period_days: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartBillingPeriodResponse {
    pub workflow_id: String,
    pub customer_id: String,
    pub currency: Currency,
    pub billing_period_days: u32,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBillRequest {
    #[validate(custom(function = "validate_billable_currency"))]
    pub currency: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateBillResponse {
    pub bill_id: Uuid,
    pub workflow_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddLineItemRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub description: String,
    #[validate(custom(function = "validate_line_item_amount"))]
    pub amount: Decimal,
    #[validate(range(min = 1, max = 1_000_000, message = "quantity must be between 1 and 1000000"))]
    pub quantity: u32,
    #[validate(custom(function = "validate_billable_currency"))]
    pub currency: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddLineItemResponse {
    pub line_item_id: Uuid,
    pub bill: BillResponse,
}

#[derive(Debug, Default, Deserialize)]
pub struct CloseBillRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

impl CloseBillRequest {
    pub const DEFAULT_REASON: &'static str = "Closed on request";

    pub fn reason(&self) -> String {
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(Self::DEFAULT_REASON)
            .to_string()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CloseBillResponse {
    pub bill: BillResponse,
    pub total_amount: Decimal,
    pub total_items: usize,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ListBillsParams {
    pub status: Option<String>,
}

impl ListBillsParams {
    /// `None` when no status was given; an unknown status is an error
    pub fn status(&self) -> Result<Option<BillStatus>, String> {
        self.status
            .as_deref()
            .map(|s| s.parse::<BillStatus>().map_err(|e| e.to_string()))
            .transpose()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListBillsResponse {
    pub bills: Vec<BillResponse>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CloseBillingPeriodResponse {
    pub workflow_id: String,
    pub bills: Vec<BillResponse>,
    pub final_amount_usd: Decimal,
    pub final_amount_gel: Decimal,
}

impl CloseBillingPeriodResponse {
    pub fn new(workflow_id: String, summary: &PeriodSummary) -> Self {
        Self {
            workflow_id,
            bills: summary.bills.iter().map(BillResponse::from).collect(),
            final_amount_usd: summary.final_amount_usd.amount(),
            final_amount_gel: summary.final_amount_gel.amount(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LineItemResponse {
    pub id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub quantity: u32,
    pub submitted_amount: Decimal,
    pub submitted_currency: Currency,
    pub accrual_factor: Decimal,
    pub added_at: DateTime<Utc>,
}

impl From<&LineItem> for LineItemResponse {
    fn from(item: &LineItem) -> Self {
        Self {
            id: *item.id.as_uuid(),
            description: item.description.clone(),
            amount: item.amount.amount(),
            quantity: item.quantity,
            submitted_amount: item.submitted.amount(),
            submitted_currency: item.submitted.currency(),
            accrual_factor: item.accrual_factor,
            added_at: item.added_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BillResponse {
    pub id: Uuid,
    pub status: BillStatus,
    pub currency: Currency,
    pub total_amount: Decimal,
    pub line_items: Vec<LineItemResponse>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_reason: Option<String>,
}

impl From<&Bill> for BillResponse {
    fn from(bill: &Bill) -> Self {
        Self {
            id: *bill.id().as_uuid(),
            status: bill.status(),
            currency: bill.currency(),
            total_amount: bill.total_amount().amount(),
            line_items: bill.line_items().iter().map(LineItemResponse::from).collect(),
            created_at: bill.created_at(),
            closed_at: bill.closed_at(),
            close_reason: bill.close_reason().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_request_validation() {
        let request = StartBillingPeriodRequest {
            customer_id: " ".to_string(),
            currency: "EUR".to_string(),
            billing_period_days: 0,
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("customer_id"));
        assert!(fields.contains_key("currency"));
        assert!(fields.contains_key("billing_period_days"));
    }

    #[test]
    fn test_add_line_item_validation() {
        let request = AddLineItemRequest {
            description: "Hosting".to_string(),
            amount: Decimal::new(-1, 0),
            quantity: 0,
            currency: "GEL".to_string(),
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("amount"));
        assert!(fields.contains_key("quantity"));
        assert!(!fields.contains_key("currency"));
    }

    #[test]
    fn test_add_line_item_amount_upper_bound() {
        let request = |amount: Decimal, quantity: u32| AddLineItemRequest {
            description: "Hosting".to_string(),
            amount,
            quantity,
            currency: "USD".to_string(),
        };

        assert!(request(Decimal::from(MAX_LINE_ITEM_AMOUNT), 1).validate().is_ok());

        let errors = request(Decimal::MAX / Decimal::TWO, 1).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("amount"));

        let errors = request(Decimal::ONE, 1_000_001).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("quantity"));
    }

    #[test]
    fn test_list_status_parsing() {
        let params = ListBillsParams { status: None };
        assert_eq!(params.status(), Ok(None));
        let params = ListBillsParams { status: Some("CLOSED".to_string()) };
        assert_eq!(params.status(), Ok(Some(BillStatus::Closed)));
        let params = ListBillsParams { status: Some(String::new()) };
        assert!(params.status().is_err());
    }

    #[test]
    fn test_close_reason_default() {
        assert_eq!(CloseBillRequest::default().reason(), CloseBillRequest::DEFAULT_REASON);
        let request = CloseBillRequest { reason: Some("Paid".to_string()) };
        assert_eq!(request.reason(), "Paid");
    }
}
