use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;
use tracing::{error, info, instrument};

use super::error::{service_error_to_response, ErrorResponse};
use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::app::AppState;
use crate::models::{
    Booking, BookingFilters, BookingListResponse, BookingStatus, CreateBookingRequest,
    CurrentUser, UpdateBookingStatusRequest,
};

/// Query parameters for listing bookings
#[derive(Debug, Deserialize)]
pub struct ListBookingsQuery {
    pub restaurant_id: Option<i64>,
    pub status: Option<BookingStatus>,
}

#[instrument(name = "create_booking", skip(state, request), fields(
    restaurant_id = %request.restaurant_id,
    guests = %request.guests,
))]
pub async fn create_booking(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(request): ApiJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), ErrorResponse> {
    crate::info_with_trace!(user_id = current.id, "Creating booking");

    match state.booking_service.create_booking(&current, request).await {
        Ok(booking) => {
            info!("Successfully created booking {}", booking.id);
            Ok((StatusCode::CREATED, Json(booking)))
        }
        Err(err) => {
            error!("Failed to create booking: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "list_bookings", skip(state))]
pub async fn list_bookings(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiQuery(query): ApiQuery<ListBookingsQuery>,
) -> Result<Json<BookingListResponse>, ErrorResponse> {
    let filters = BookingFilters {
        user_id: None,
        restaurant_id: query.restaurant_id,
        status: query.status,
    };

    match state.booking_service.list_bookings(&current, filters).await {
        Ok(bookings) => Ok(Json(BookingListResponse {
            total_count: bookings.len(),
            bookings,
        })),
        Err(err) => {
            error!("Failed to list bookings: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "get_booking", skip(state), fields(booking_id = %id))]
pub async fn get_booking(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Booking>, ErrorResponse> {
    match state.booking_service.get_booking(&current, id).await {
        Ok(booking) => Ok(Json(booking)),
        Err(err) => {
            error!("Failed to get booking {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "update_booking_status", skip(state, request), fields(
    booking_id = %id,
    status = %request.status,
))]
pub async fn update_booking_status(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateBookingStatusRequest>,
) -> Result<Json<Booking>, ErrorResponse> {
    match state
        .booking_service
        .update_status(&current, id, request.status, request.table_id)
        .await
    {
        Ok(booking) => Ok(Json(booking)),
        Err(err) => {
            error!("Failed to update booking {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}
