//! Billing period handlers
//!
//! Handlers validate the request, check bill preconditions with a query, and
//! then send the signal. Because queries are ordered after earlier signals,
//! the bill read back after a signal already reflects it.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{BillId, Currency, CustomerId, LineItemId};
use domain_billing::{
    AddLineItemSignal, Bill, BillingPeriodInput, BillingSignal, CloseBillSignal, CreateBillSignal,
    LineItemPayload,
};

use crate::dto::billing::*;
use crate::{error::ApiError, AppState};

fn customer(raw: String) -> Result<CustomerId, ApiError> {
    CustomerId::new(raw).map_err(|e| ApiError::Validation(e.to_string()))
}

fn currency(code: &str) -> Result<Currency, ApiError> {
    code.parse().map_err(|e: core_kernel::MoneyError| ApiError::Validation(e.to_string()))
}

/// Looks up a bill that must still be open
async fn open_bill(state: &AppState, customer_id: &CustomerId, bill_id: BillId) -> Result<Bill, ApiError> {
    let bill = state.periods.get_bill(customer_id, bill_id).await?;
    if !bill.can_add_line_items() {
        return Err(ApiError::Conflict(format!("bill {bill_id} is already closed")));
    }
    Ok(bill)
}

/// Starts a billing period for a customer
#[tracing::instrument(skip(state, request))]
pub async fn start_billing_period(
    State(state): State<AppState>,
    Json(request): Json<StartBillingPeriodRequest>,
) -> Result<(StatusCode, Json<StartBillingPeriodResponse>), ApiError> {
    request.validate()?;
    let customer_id = customer(request.customer_id)?;
    let currency = currency(&request.currency)?;
    let started_at = state.clock.now();

    let input = BillingPeriodInput::new(
        customer_id.clone(),
        currency,
        request.billing_period_days,
        started_at,
    );
    let key = state.periods.start_period(input).await?;
    tracing::info!(workflow_id = %key, customer_id = %customer_id, "Started billing period");

    Ok((
        StatusCode::CREATED,
        Json(StartBillingPeriodResponse {
            workflow_id: key.to_string(),
            customer_id: customer_id.to_string(),
            currency,
            billing_period_days: request.billing_period_days,
            started_at,
        }),
    ))
}

/// Creates a bill in the customer's current period
#[tracing::instrument(skip(state, request))]
pub async fn create_bill(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
    Json(request): Json<CreateBillRequest>,
) -> Result<(StatusCode, Json<CreateBillResponse>), ApiError> {
    request.validate()?;
    let customer_id = customer(customer_id)?;
    let currency = currency(&request.currency)?;
    let key = state.periods.current_period(&customer_id).await?;

    let bill_id = BillId::new();
    state
        .periods
        .signal(
            &customer_id,
            BillingSignal::CreateBill(CreateBillSignal { bill_id, currency }),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateBillResponse {
            bill_id: *bill_id.as_uuid(),
            workflow_id: key.to_string(),
        }),
    ))
}

/// Adds a line item to an open bill
#[tracing::instrument(skip(state, request))]
pub async fn add_line_item(
    State(state): State<AppState>,
    Path((customer_id, bill_id)): Path<(String, Uuid)>,
    Json(request): Json<AddLineItemRequest>,
) -> Result<Json<AddLineItemResponse>, ApiError> {
    request.validate()?;
    let customer_id = customer(customer_id)?;
    let currency = currency(&request.currency)?;
    let bill_id = BillId::from_uuid(bill_id);
    open_bill(&state, &customer_id, bill_id).await?;

    let line_item_id = LineItemId::new();
    let signal = BillingSignal::AddLineItem(AddLineItemSignal {
        bill_id,
        line_item: LineItemPayload {
            id: line_item_id,
            description: request.description,
            amount: request.amount,
            quantity: request.quantity,
            currency,
        },
    });
    state.periods.signal(&customer_id, signal).await?;

    let bill = state.periods.get_bill(&customer_id, bill_id).await?;
    tracing::info!(
        bill_id = %bill_id,
        line_item_id = %line_item_id,
        total = %bill.total_amount(),
        "Added line item"
    );

    Ok(Json(AddLineItemResponse {
        line_item_id: *line_item_id.as_uuid(),
        bill: BillResponse::from(&bill),
    }))
}

/// Closes a single bill
#[tracing::instrument(skip(state, body))]
pub async fn close_bill(
    State(state): State<AppState>,
    Path((customer_id, bill_id)): Path<(String, Uuid)>,
    body: Option<Json<CloseBillRequest>>,
) -> Result<Json<CloseBillResponse>, ApiError> {
    let customer_id = customer(customer_id)?;
    let bill_id = BillId::from_uuid(bill_id);
    let reason = body.map(|Json(b)| b).unwrap_or_default().reason();
    open_bill(&state, &customer_id, bill_id).await?;

    state
        .periods
        .signal(
            &customer_id,
            BillingSignal::CloseBill(CloseBillSignal {
                bill_id,
                reason: reason.clone(),
            }),
        )
        .await?;

    let bill = state.periods.get_bill(&customer_id, bill_id).await?;
    tracing::info!(bill_id = %bill_id, reason = %reason, total = %bill.total_amount(), "Closed bill");

    Ok(Json(CloseBillResponse {
        total_amount: bill.total_amount().amount(),
        total_items: bill.line_items().len(),
        closed_at: bill.closed_at(),
        bill: BillResponse::from(&bill),
    }))
}

/// Gets a bill by ID
pub async fn get_bill(
    State(state): State<AppState>,
    Path((customer_id, bill_id)): Path<(String, Uuid)>,
) -> Result<Json<BillResponse>, ApiError> {
    let customer_id = customer(customer_id)?;
    let bill = state
        .periods
        .get_bill(&customer_id, BillId::from_uuid(bill_id))
        .await?;
    Ok(Json(BillResponse::from(&bill)))
}

/// Lists bills, optionally filtered by status
pub async fn list_bills(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
    Query(params): Query<ListBillsParams>,
) -> Result<Json<ListBillsResponse>, ApiError> {
    let customer_id = customer(customer_id)?;
    let status = params.status().map_err(ApiError::Validation)?;
    let bills = state.periods.list_bills(&customer_id, status).await?;

    Ok(Json(ListBillsResponse {
        total: bills.len(),
        bills: bills.iter().map(BillResponse::from).collect(),
    }))
}

/// Closes the customer's billing period and returns the settlement
#[tracing::instrument(skip(state))]
pub async fn close_billing_period(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> Result<Json<CloseBillingPeriodResponse>, ApiError> {
    let customer_id = customer(customer_id)?;
    let key = state.periods.current_period(&customer_id).await?;
    let summary = state.periods.close_period(&customer_id).await?;

    tracing::info!(
        workflow_id = %key,
        bills = summary.bills.len(),
        final_amount_usd = %summary.final_amount_usd,
        "Closed billing period"
    );

    Ok(Json(CloseBillingPeriodResponse::new(key.to_string(), &summary)))
}
