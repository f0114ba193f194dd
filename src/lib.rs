//! Parcelflow API library
//!
//! Delivery core of a multi-office parcel network: fee quoting, the order
//! lifecycle, driver dispatch and cash-on-delivery reconciliation.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::{Action, AuthRouterExt, AuthService};
use crate::db::DbPool;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Versioned API; every group is gated on the [`Action`] its role must permit.
pub fn api_v1_routes() -> Router<AppState> {
    use handlers::{fees, orders, payment_submissions, shipments, transactions};

    let fees_quote = Router::new()
        .route("/fees/quote", post(fees::quote_fee))
        .with_action(Action::QuoteFee);

    let promotions = Router::new()
        .route("/promotions", get(fees::list_promotions))
        .with_action(Action::ViewPromotions);

    let orders_create = Router::new()
        .route("/orders", post(orders::create_order))
        .with_action(Action::CreateOrder);

    let orders_read = Router::new()
        .route("/orders", get(orders::list_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/history", get(orders::get_order_history))
        .route(
            "/orders/tracking/:tracking_number",
            get(orders::get_order_by_tracking_number),
        )
        .with_action(Action::ViewOrders);

    let orders_draft = Router::new()
        .route("/orders/:id", put(orders::update_draft))
        .route("/orders/:id/submit", post(orders::submit_order))
        .with_action(Action::ManageDraft);

    let orders_confirm = Router::new()
        .route("/orders/:id/confirm", post(orders::confirm_order))
        .with_action(Action::ConfirmOrder);

    let orders_cancel = Router::new()
        .route("/orders/:id/cancel", post(orders::cancel_order))
        .with_action(Action::CancelOrder);

    let orders_deliver = Router::new()
        .route("/orders/:id/deliver", post(orders::deliver_order))
        .with_action(Action::DeliverOrder);

    let dispatch = Router::new()
        .route("/shipments/pickup", post(shipments::pick_up))
        .route("/shipments/:id/start", post(shipments::start_shipment))
        .route("/shipments/:id/finish", post(shipments::finish_shipment))
        .with_action(Action::DispatchShipment);

    let shipments_read = Router::new()
        .route("/shipments", get(shipments::list_shipments))
        .route("/shipments/:id", get(shipments::get_shipment))
        .with_action(Action::ViewShipments);

    let cod_submit = Router::new()
        .route("/payment-submissions", post(payment_submissions::submit_cod))
        .with_action(Action::SubmitCod);

    let cod_read = Router::new()
        .route(
            "/payment-submissions",
            get(payment_submissions::list_submissions),
        )
        .route(
            "/payment-submissions/:id",
            get(payment_submissions::get_submission),
        )
        .route(
            "/offices/:id/cod-balance",
            get(payment_submissions::office_cod_balance),
        )
        .with_action(Action::ViewSubmissions);

    let cod_reconcile = Router::new()
        .route(
            "/payment-submissions/:id/reconcile",
            post(payment_submissions::reconcile_submission),
        )
        .with_action(Action::ReconcileSubmission);

    let ledger_read = Router::new()
        .route("/ledger", get(transactions::list_ledger))
        .with_action(Action::ViewLedger);

    let ledger_record = Router::new()
        .route("/ledger", post(transactions::record_entry))
        .with_action(Action::RecordLedgerEntry);

    let ledger_resolve = Router::new()
        .route("/ledger/:id/confirm", post(transactions::confirm_entry))
        .route("/ledger/:id/reject", post(transactions::reject_entry))
        .with_action(Action::ResolveLedgerEntry);

    Router::new()
        .route("/status", get(api_status))
        .merge(fees_quote)
        .merge(promotions)
        .merge(orders_create)
        .merge(orders_read)
        .merge(orders_draft)
        .merge(orders_confirm)
        .merge(orders_cancel)
        .merge(orders_deliver)
        .merge(dispatch)
        .merge(shipments_read)
        .merge(cod_submit)
        .merge(cod_read)
        .merge(cod_reconcile)
        .merge(ledger_read)
        .merge(ledger_record)
        .merge(ledger_resolve)
}

/// Full application router without the deployment-specific CORS and
/// compression layers.
pub fn build_router(state: AppState, auth_service: Arc<AuthService>) -> Router {
    let db = state.db.clone();
    Router::new()
        .route("/", get(|| async { "parcelflow-api up" }))
        .route("/metrics", get(metrics::metrics_handler))
        .nest("/api/v1", api_v1_routes())
        .layer(Extension(auth_service))
        .with_state(state)
        .nest("/health", health::health_routes(db))
        .merge(openapi::swagger_ui())
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "git": option_env!("GIT_HASH").unwrap_or("unknown"),
        "service": "parcelflow-api",
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}
