use axum::{
    extract::{MatchedPath, Request},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use opentelemetry::trace::TraceContextExt;
use std::{future::Future, sync::Arc, time::Instant};
use tracing::{error, info, instrument, warn, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;
use uuid::Uuid;

use super::Metrics;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request span, metrics and completion log
pub async fn observability_middleware(
    metrics: Arc<Metrics>,
    request: Request,
    next: Next,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let client_ip = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .or_else(|| {
            request
                .headers()
                .get("x-real-ip")
                .and_then(|value| value.to_str().ok())
        })
        .unwrap_or("unknown")
        .trim()
        .to_string();

    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched_path| matched_path.as_str().to_string())
        .unwrap_or_else(|| path.clone());

    let span_name = format!("{} {}", method, endpoint);
    let span = tracing::info_span!(
        target: "restaurant_rs::http",
        "http_request",
        otel.name = %span_name,
        otel.kind = "server",
        http.method = %method,
        http.route = %endpoint,
        http.client_ip = %client_ip,
        request_id = %request_id,
        http.status_code = tracing::field::Empty,
        http.response_time_ms = tracing::field::Empty,
    );

    async move {
        metrics.increment_in_flight(&method, &endpoint);

        let mut response = next.run(request).await;

        let duration = start_time.elapsed();
        let status_code = response.status().as_u16();

        let current_span = tracing::Span::current();
        current_span.record("http.status_code", status_code);
        current_span.record("http.response_time_ms", duration.as_millis() as u64);

        let otel_context = current_span.context();
        let otel_span = otel_context.span();
        if status_code >= 500 {
            otel_span.set_status(opentelemetry::trace::Status::error("HTTP server error"));
        } else {
            otel_span.set_status(opentelemetry::trace::Status::Ok);
        }

        metrics.record_http_request(&method, &endpoint, status_code, duration.as_secs_f64());
        metrics.decrement_in_flight(&method, &endpoint);

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }

        if status_code >= 500 {
            error!(
                method = %method,
                path = %endpoint,
                status_code,
                duration_ms = duration.as_millis() as u64,
                "Request failed"
            );
        } else if status_code >= 400 {
            warn!(
                method = %method,
                path = %endpoint,
                status_code,
                duration_ms = duration.as_millis() as u64,
                "Request rejected"
            );
        } else {
            info!(
                method = %method,
                path = %endpoint,
                status_code,
                duration_ms = duration.as_millis() as u64,
                "Request completed"
            );
        }

        response
    }
    .instrument(span)
    .await
}

/// Wraps repository calls with timing and database metrics
#[derive(Clone)]
pub struct DatabaseTracingMiddleware {
    metrics: Arc<Metrics>,
}

impl DatabaseTracingMiddleware {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }

    #[instrument(skip_all, fields(db.operation = %operation, db.table = %table))]
    pub async fn trace_operation<F, T, E>(
        &self,
        operation: &str,
        table: &str,
        future: F,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let start_time = Instant::now();
        let result = future.await;
        let duration_seconds = start_time.elapsed().as_secs_f64();

        match &result {
            Ok(_) => {
                self.metrics
                    .record_database_operation(operation, table, true, duration_seconds);
            }
            Err(error) => {
                self.metrics
                    .record_database_operation(operation, table, false, duration_seconds);
                error!(error = %error, "Database operation failed");
            }
        }

        result
    }
}

/// Business operation kinds with their own counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusinessDomain {
    Order,
    Booking,
    Review,
}

/// Wraps service operations with outcome counters
#[derive(Clone)]
pub struct BusinessTracingMiddleware {
    metrics: Arc<Metrics>,
}

impl BusinessTracingMiddleware {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub async fn trace<F, T, E>(&self, domain: BusinessDomain, operation: &str, future: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let start_time = Instant::now();
        let result = future.await;
        let success = result.is_ok();

        match domain {
            BusinessDomain::Order => self.metrics.record_order_operation(operation, success),
            BusinessDomain::Booking => self.metrics.record_booking_operation(operation, success),
            BusinessDomain::Review => self.metrics.record_review_operation(operation, success),
        }

        if let Err(error) = &result {
            warn!(
                domain = ?domain,
                operation,
                error = %error,
                duration_ms = start_time.elapsed().as_millis() as u64,
                "Business operation failed"
            );
        }

        result
    }
}
