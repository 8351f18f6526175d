use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;
use tracing::{error, info, instrument};

use super::error::{service_error_to_response, ErrorResponse};
use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::app::AppState;
use crate::auth::OptionalUser;
use crate::models::{
    CreateRestaurantRequest, CreateTableRequest, CurrentUser, DiningTable, Restaurant,
    RestaurantFilters, RestaurantListResponse, RestaurantResponse, UpdateRestaurantRequest,
    UpdateTableStatusRequest,
};

/// Query parameters for listing restaurants
#[derive(Debug, Deserialize)]
pub struct ListRestaurantsQuery {
    pub search: Option<String>,
    pub cuisine: Option<String>,
    pub include_inactive: Option<bool>,
}

// =============================================================================
// RESTAURANT ENDPOINTS
// =============================================================================

#[instrument(name = "list_restaurants", skip(state, user), fields(
    search = query.search.as_deref(),
    cuisine = query.cuisine.as_deref(),
))]
pub async fn list_restaurants(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    ApiQuery(query): ApiQuery<ListRestaurantsQuery>,
) -> Result<Json<RestaurantListResponse>, ErrorResponse> {
    let filters = RestaurantFilters {
        search: query.search,
        cuisine: query.cuisine,
        include_inactive: query.include_inactive.unwrap_or(false),
    };

    match state.restaurant_service.list(user.as_ref(), filters).await {
        Ok(restaurants) => {
            info!("Successfully listed {} restaurants", restaurants.len());
            Ok(Json(RestaurantListResponse {
                total_count: restaurants.len(),
                restaurants,
            }))
        }
        Err(err) => {
            error!("Failed to list restaurants: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "get_restaurant", skip(state, user), fields(restaurant_id = %id))]
pub async fn get_restaurant(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<RestaurantResponse>, ErrorResponse> {
    match state.restaurant_service.get(user.as_ref(), id).await {
        Ok(restaurant) => Ok(Json(restaurant)),
        Err(err) => {
            error!("Failed to get restaurant {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "create_restaurant", skip(state, request), fields(name = %request.name))]
pub async fn create_restaurant(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(request): ApiJson<CreateRestaurantRequest>,
) -> Result<(StatusCode, Json<Restaurant>), ErrorResponse> {
    match state.restaurant_service.create(&current, request).await {
        Ok(restaurant) => {
            info!("Successfully created restaurant {}", restaurant.id);
            Ok((StatusCode::CREATED, Json(restaurant)))
        }
        Err(err) => {
            error!("Failed to create restaurant: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "update_restaurant", skip(state, request), fields(restaurant_id = %id))]
pub async fn update_restaurant(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateRestaurantRequest>,
) -> Result<Json<Restaurant>, ErrorResponse> {
    match state.restaurant_service.update(&current, id, request).await {
        Ok(restaurant) => Ok(Json(restaurant)),
        Err(err) => {
            error!("Failed to update restaurant {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "delete_restaurant", skip(state), fields(restaurant_id = %id))]
pub async fn delete_restaurant(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ErrorResponse> {
    match state.restaurant_service.delete(&current, id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(err) => {
            error!("Failed to delete restaurant {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}

// =============================================================================
// TABLE ENDPOINTS
// =============================================================================

#[instrument(name = "list_tables", skip(state), fields(restaurant_id = %id))]
pub async fn list_tables(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<DiningTable>>, ErrorResponse> {
    match state.restaurant_service.list_tables(&current, id).await {
        Ok(tables) => Ok(Json(tables)),
        Err(err) => {
            error!("Failed to list tables of restaurant {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "create_table", skip(state, request), fields(restaurant_id = %id))]
pub async fn create_table(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<CreateTableRequest>,
) -> Result<(StatusCode, Json<DiningTable>), ErrorResponse> {
    match state
        .restaurant_service
        .create_table(&current, id, request)
        .await
    {
        Ok(table) => Ok((StatusCode::CREATED, Json(table))),
        Err(err) => {
            error!("Failed to create table in restaurant {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "update_table_status", skip(state), fields(table_id = %id))]
pub async fn update_table_status(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateTableStatusRequest>,
) -> Result<Json<DiningTable>, ErrorResponse> {
    match state
        .restaurant_service
        .update_table_status(&current, id, request.status)
        .await
    {
        Ok(table) => Ok(Json(table)),
        Err(err) => {
            error!("Failed to update table {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "delete_table", skip(state), fields(table_id = %id))]
pub async fn delete_table(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ErrorResponse> {
    match state.restaurant_service.delete_table(&current, id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(err) => {
            error!("Failed to delete table {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}
