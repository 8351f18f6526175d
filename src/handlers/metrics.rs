use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{error, instrument};

use super::error::error_response;
use crate::observability::Metrics;

pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Prometheus text exposition of the service registry
#[instrument(name = "metrics_handler", skip(metrics))]
pub async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> Response {
    let exposition = match metrics.encode() {
        Ok(text) => text,
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics")
                .into_response();
        }
    };

    ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], exposition).into_response()
}
