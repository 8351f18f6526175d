use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;
use tracing::{error, info, instrument};

use super::error::{service_error_to_response, ErrorResponse};
use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::app::AppState;
use crate::models::{
    CreateMenuCategoryRequest, CreateMenuItemRequest, CurrentUser, MenuCategory, MenuItem,
    MenuItemFilters, MenuResponse, UpdateMenuItemRequest,
};

/// Query parameters for listing menu items
#[derive(Debug, Deserialize)]
pub struct ListMenuItemsQuery {
    pub restaurant_id: Option<i64>,
    pub category_id: Option<i64>,
    pub search: Option<String>,
    pub available_only: Option<bool>,
}

impl From<ListMenuItemsQuery> for MenuItemFilters {
    fn from(query: ListMenuItemsQuery) -> Self {
        MenuItemFilters {
            restaurant_id: query.restaurant_id,
            category_id: query.category_id,
            search: query.search,
            available_only: query.available_only.unwrap_or(false),
        }
    }
}

#[instrument(name = "get_menu", skip(state), fields(restaurant_id = %id))]
pub async fn get_menu(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MenuResponse>, ErrorResponse> {
    match state.menu_service.get_menu(id).await {
        Ok(menu) => {
            info!(
                "Menu of restaurant {} has {} sections",
                id,
                menu.sections.len()
            );
            Ok(Json(menu))
        }
        Err(err) => {
            error!("Failed to load menu of restaurant {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "list_menu_items", skip(state))]
pub async fn list_items(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListMenuItemsQuery>,
) -> Result<Json<Vec<MenuItem>>, ErrorResponse> {
    match state.menu_service.list_items(query.into()).await {
        Ok(items) => Ok(Json(items)),
        Err(err) => {
            error!("Failed to list menu items: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "get_menu_item", skip(state), fields(menu_item_id = %id))]
pub async fn get_item(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MenuItem>, ErrorResponse> {
    match state.menu_service.get_item(id).await {
        Ok(item) => Ok(Json(item)),
        Err(err) => {
            error!("Failed to get menu item {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "create_menu_category", skip(state, request))]
pub async fn create_category(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(request): ApiJson<CreateMenuCategoryRequest>,
) -> Result<(StatusCode, Json<MenuCategory>), ErrorResponse> {
    match state.menu_service.create_category(&current, request).await {
        Ok(category) => Ok((StatusCode::CREATED, Json(category))),
        Err(err) => {
            error!("Failed to create menu category: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "create_menu_item", skip(state, request), fields(
    restaurant_id = %request.restaurant_id,
    name = %request.name,
))]
pub async fn create_item(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(request): ApiJson<CreateMenuItemRequest>,
) -> Result<(StatusCode, Json<MenuItem>), ErrorResponse> {
    match state.menu_service.create_item(&current, request).await {
        Ok(item) => {
            info!("Successfully created menu item {}", item.id);
            Ok((StatusCode::CREATED, Json(item)))
        }
        Err(err) => {
            error!("Failed to create menu item: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "update_menu_item", skip(state, request), fields(menu_item_id = %id))]
pub async fn update_item(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateMenuItemRequest>,
) -> Result<Json<MenuItem>, ErrorResponse> {
    match state.menu_service.update_item(&current, id, request).await {
        Ok(item) => Ok(Json(item)),
        Err(err) => {
            error!("Failed to update menu item {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "delete_menu_item", skip(state), fields(menu_item_id = %id))]
pub async fn delete_item(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ErrorResponse> {
    match state.menu_service.delete_item(&current, id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(err) => {
            error!("Failed to delete menu item {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}
