use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use super::error::{service_error_to_response, ErrorResponse};
use super::extract::ApiQuery;
use crate::app::AppState;
use crate::models::{AnalyticsQuery, AnalyticsSummary, CurrentUser, ServiceError};
use crate::repositories::{seed_if_empty, SeedReport};

/// Response for seeding operations
#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub message: String,
    #[serde(flatten)]
    pub report: SeedReport,
    pub timestamp: String,
}

/// Seed the demo data set; a database that already holds restaurants is left alone
#[instrument(name = "seed_database", skip(state))]
pub async fn seed_database(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<(StatusCode, Json<SeedResponse>), ErrorResponse> {
    if !current.is_admin() {
        warn!("Non-admin user {} attempted to seed", current.id);
        return Err(service_error_to_response(ServiceError::forbidden(
            "Administrator role required",
        )));
    }

    let timestamp = chrono::Utc::now().to_rfc3339();

    match seed_if_empty(&state.database).await {
        Ok(report) if report.seeded => {
            info!(
                "Seeded {} restaurants and {} menu items",
                report.restaurants, report.menu_items
            );
            Ok((
                StatusCode::CREATED,
                Json(SeedResponse {
                    message: "Database seeded".to_string(),
                    report,
                    timestamp,
                }),
            ))
        }
        Ok(report) => {
            info!("Database already contains data, seed skipped");
            Ok((
                StatusCode::OK,
                Json(SeedResponse {
                    message: "Database already contains data".to_string(),
                    report,
                    timestamp,
                }),
            ))
        }
        Err(err) => {
            error!("Failed to seed database: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "analytics_summary", skip(state))]
pub async fn analytics_summary(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiQuery(query): ApiQuery<AnalyticsQuery>,
) -> Result<Json<AnalyticsSummary>, ErrorResponse> {
    match state.analytics_service.summary(&current, query).await {
        Ok(summary) => Ok(Json(summary)),
        Err(err) => {
            error!("Failed to compute analytics: {}", err);
            Err(service_error_to_response(err))
        }
    }
}
