use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;
use tracing::{error, info, instrument};

use super::error::{service_error_to_response, ErrorResponse};
use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::app::AppState;
use crate::models::{
    CreateOrderRequest, CurrentUser, Order, OrderFilters, OrderListResponse, OrderStatus,
    UpdateOrderStatusRequest,
};

/// Query parameters for listing orders
#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub restaurant_id: Option<i64>,
    pub status: Option<OrderStatus>,
}

#[instrument(name = "create_order", skip(state, request), fields(
    restaurant_id = %request.restaurant_id,
    lines = request.items.len(),
))]
pub async fn create_order(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(request): ApiJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ErrorResponse> {
    crate::info_with_trace!(user_id = current.id, "Placing order");

    match state.order_service.create_order(&current, request).await {
        Ok(order) => {
            info!(
                "Successfully created order {} totalling {}",
                order.id, order.total_amount
            );
            Ok((StatusCode::CREATED, Json(order)))
        }
        Err(err) => {
            error!("Failed to create order: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "list_orders", skip(state))]
pub async fn list_orders(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiQuery(query): ApiQuery<ListOrdersQuery>,
) -> Result<Json<OrderListResponse>, ErrorResponse> {
    let filters = OrderFilters {
        restaurant_id: query.restaurant_id,
        status: query.status,
        ..Default::default()
    };

    match state.order_service.list_orders(&current, filters).await {
        Ok(orders) => Ok(Json(OrderListResponse {
            total_count: orders.len(),
            orders,
        })),
        Err(err) => {
            error!("Failed to list orders: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "get_order", skip(state), fields(order_id = %id))]
pub async fn get_order(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Order>, ErrorResponse> {
    match state.order_service.get_order(&current, id).await {
        Ok(order) => Ok(Json(order)),
        Err(err) => {
            error!("Failed to get order {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "update_order_status", skip(state, request), fields(
    order_id = %id,
    status = %request.status,
))]
pub async fn update_order_status(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateOrderStatusRequest>,
) -> Result<Json<Order>, ErrorResponse> {
    match state
        .order_service
        .update_status(&current, id, request.status)
        .await
    {
        Ok(order) => {
            info!("Order {} is now {}", order.id, order.status);
            Ok(Json(order))
        }
        Err(err) => {
            error!("Failed to update order {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}
