//! HTTP API Layer
//!
//! This crate provides the REST API for billing periods using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: request handlers for billing periods and health
//! - **Middleware**: request logging
//! - **DTOs**: request/response data transfer objects with validation
//! - **Error Handling**: consistent error responses
//!
//! Handlers only talk to the [`BillingPeriodPort`], so the router can be
//! driven by the process runtime or by a mock in tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let app = create_router(AppState::new(periods, clock, config));
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware as axum_middleware,
};
use tower_http::trace::TraceLayer;
use tower_http::cors::{CorsLayer, Any};

use core_kernel::Clock;
use domain_billing::BillingPeriodPort;

use crate::config::ApiConfig;
use crate::middleware::request_logging;
use crate::handlers::{billing, health};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub periods: Arc<dyn BillingPeriodPort>,
    /// Stamps the start of new billing periods
    pub clock: Arc<dyn Clock>,
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(
        periods: Arc<dyn BillingPeriodPort>,
        clock: Arc<dyn Clock>,
        config: ApiConfig,
    ) -> Self {
        Self { periods, clock, config }
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(health::health_check));

    let customer_routes = Router::new()
        .route("/bills", post(billing::create_bill).get(billing::list_bills))
        .route("/bills/:bill_id", get(billing::get_bill))
        .route("/bills/:bill_id/line-items", post(billing::add_line_item))
        .route("/bills/:bill_id/close", post(billing::close_bill))
        .route("/billing-period/close", post(billing::close_billing_period));

    let api_routes = Router::new()
        .route("/billing-periods", post(billing::start_billing_period))
        .nest("/customers/:customer_id", customer_routes)
        .layer(axum_middleware::from_fn(request_logging));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
