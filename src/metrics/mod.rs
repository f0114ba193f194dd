/*!
 * # Metrics Module
 *
 * Business counters exported in Prometheus text format at `/metrics`.
 */

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::error;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new_custom(Some("parcelflow".into()), None)
        .expect("registry can be created");
    pub static ref ORDERS_CREATED: IntCounter =
        IntCounter::new("orders_created_total", "Total number of orders created")
            .expect("metric can be created");
    pub static ref ORDER_TRANSITIONS: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "order_transitions_total",
            "Order status transitions by target status"
        ),
        &["to"]
    )
    .expect("metric can be created");
    pub static ref SHIPMENT_PICKUPS: IntCounter = IntCounter::new(
        "shipment_pickups_total",
        "Total number of shipments created by pickup"
    )
    .expect("metric can be created");
    pub static ref PICKUP_ITEMS_SKIPPED: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "pickup_items_skipped_total",
            "Orders skipped during pickup by reason"
        ),
        &["reason"]
    )
    .expect("metric can be created");
    pub static ref DELIVERIES: IntCounter =
        IntCounter::new("deliveries_total", "Total number of delivered orders")
            .expect("metric can be created");
    pub static ref COD_SUBMISSIONS: IntCounter = IntCounter::new(
        "cod_submissions_total",
        "Total number of COD payment submissions"
    )
    .expect("metric can be created");
    pub static ref RECONCILIATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "submission_reconciliations_total",
            "Reconciled payment submissions by outcome"
        ),
        &["status"]
    )
    .expect("metric can be created");
    pub static ref LEDGER_ENTRIES: IntCounter = IntCounter::new(
        "ledger_entries_posted_total",
        "Total number of ledger entries posted"
    )
    .expect("metric can be created");
}

/// Registers every collector with [`REGISTRY`]. Safe to call more than once.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ORDERS_CREATED.clone()),
        Box::new(ORDER_TRANSITIONS.clone()),
        Box::new(SHIPMENT_PICKUPS.clone()),
        Box::new(PICKUP_ITEMS_SKIPPED.clone()),
        Box::new(DELIVERIES.clone()),
        Box::new(COD_SUBMISSIONS.clone()),
        Box::new(RECONCILIATIONS.clone()),
        Box::new(LEDGER_ENTRIES.clone()),
    ];
    for collector in collectors {
        // AlreadyReg on repeated calls is expected.
        let _ = REGISTRY.register(collector);
    }
}

pub fn render() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// `GET /metrics`
pub async fn metrics_handler() -> Response {
    match render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
