use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;
use tracing::{error, info, instrument};

use super::error::{service_error_to_response, ErrorResponse};
use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::app::AppState;
use crate::models::{CurrentUser, Role, UpdateProfileRequest, UpdateRoleRequest, User, UserFilters};

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<Role>,
}

#[instrument(name = "update_me", skip(state, request))]
pub async fn update_me(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(request): ApiJson<UpdateProfileRequest>,
) -> Result<Json<User>, ErrorResponse> {
    match state.user_service.update_profile(&current, request).await {
        Ok(user) => Ok(Json(user)),
        Err(err) => {
            error!("Failed to update profile for user {}: {}", current.id, err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "list_users", skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiQuery(query): ApiQuery<ListUsersQuery>,
) -> Result<Json<Vec<User>>, ErrorResponse> {
    let filters = UserFilters { role: query.role };

    match state.user_service.list_users(&current, filters).await {
        Ok(users) => {
            info!("Listed {} users", users.len());
            Ok(Json(users))
        }
        Err(err) => {
            error!("Failed to list users: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "set_role", skip(state), fields(user_id = %user_id))]
pub async fn set_role(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(user_id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateRoleRequest>,
) -> Result<Json<User>, ErrorResponse> {
    match state
        .user_service
        .set_role(&current, user_id, request.role)
        .await
    {
        Ok(user) => Ok(Json(user)),
        Err(err) => {
            error!("Failed to change role of user {}: {}", user_id, err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "delete_user", skip(state), fields(user_id = %user_id))]
pub async fn delete_user(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<StatusCode, ErrorResponse> {
    match state.user_service.delete_user(&current, user_id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(err) => {
            error!("Failed to delete user {}: {}", user_id, err);
            Err(service_error_to_response(err))
        }
    }
}
