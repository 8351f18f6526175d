use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use tracing::{instrument, warn};

use crate::app::AppState;

/// Health check endpoint handler; reports 503 when the database is unreachable
#[instrument(name = "health_check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let (status_code, status, database) = match state.database.ping().await {
        Ok(()) => (StatusCode::OK, "healthy", "ok"),
        Err(e) => {
            warn!(error = %e, "Database ping failed");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unavailable")
        }
    };

    (
        status_code,
        Json(json!({
            "status": status,
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "database": database,
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
}
