use axum::{extract::State, http::StatusCode, response::Json};
use tracing::{error, info, instrument, warn};

use super::error::{service_error_to_response, ErrorResponse};
use super::extract::ApiJson;
use crate::app::AppState;
use crate::models::{AuthResponse, CurrentUser, LoginRequest, RegisterRequest, User};

/// Create an account with the `user` role and return a token for it
#[instrument(name = "register", skip(state, request))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ErrorResponse> {
    match state.auth_service.register(request).await {
        Ok(response) => {
            info!(user_id = response.user.id, "Registration succeeded");
            Ok((StatusCode::CREATED, Json(response)))
        }
        Err(err) => {
            warn!("Registration failed: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "login", skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ErrorResponse> {
    match state.auth_service.login(request).await {
        Ok(response) => {
            info!(user_id = response.user.id, "Login succeeded");
            Ok(Json(response))
        }
        Err(err) => {
            warn!("Login failed: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "me", skip(state))]
pub async fn me(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<User>, ErrorResponse> {
    match state.user_service.me(&current).await {
        Ok(user) => Ok(Json(user)),
        Err(err) => {
            error!("Failed to load profile for user {}: {}", current.id, err);
            Err(service_error_to_response(err))
        }
    }
}
