//! Prometheus metrics for interaction-service.
//!
//! Exposes operation outcome counters and an HTTP handler for the `/metrics` endpoint.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

use crate::error::ServiceResult;

lazy_static! {
    /// Engine operations segmented by operation and outcome.
    pub static ref OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "interaction_operations_total",
        "Interaction engine operations segmented by operation and result",
        &["operation", "result"]
    )
    .expect("failed to register interaction_operations_total");

    /// Multi-step operations that failed after an earlier step had landed.
    pub static ref PARTIAL_WRITES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "interaction_partial_writes_total",
        "Operations that surfaced a failure after a side effect was applied",
        &["operation"]
    )
    .expect("failed to register interaction_partial_writes_total");
}

/// Record the outcome of an engine operation
pub fn observe<T>(operation: &str, result: &ServiceResult<T>) {
    let label = match result {
        Ok(_) => "ok",
        Err(err) => err.metric_label(),
    };
    OPERATIONS_TOTAL
        .with_label_values(&[operation, label])
        .inc();
}

pub fn partial_write(operation: &str) {
    PARTIAL_WRITES_TOTAL.with_label_values(&[operation]).inc();
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
