use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;
use tracing::{error, info, instrument};

use super::error::{service_error_to_response, ErrorResponse};
use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::app::AppState;
use crate::models::{
    CreateEventRequest, CurrentUser, Event, EventFilters, EventListResponse, EventRegistration,
    RegisterEventRequest, UpdateEventRequest,
};

/// Query parameters for listing events; only upcoming events unless asked otherwise
#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    pub restaurant_id: Option<i64>,
    pub upcoming_only: Option<bool>,
}

#[instrument(name = "list_events", skip(state))]
pub async fn list_events(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListEventsQuery>,
) -> Result<Json<EventListResponse>, ErrorResponse> {
    let filters = EventFilters {
        restaurant_id: query.restaurant_id,
        upcoming_only: query.upcoming_only.unwrap_or(true),
    };

    match state.event_service.list_events(filters).await {
        Ok(events) => Ok(Json(EventListResponse {
            total_count: events.len(),
            events,
        })),
        Err(err) => {
            error!("Failed to list events: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "get_event", skip(state), fields(event_id = %id))]
pub async fn get_event(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Event>, ErrorResponse> {
    match state.event_service.get_event(id).await {
        Ok(event) => Ok(Json(event)),
        Err(err) => {
            error!("Failed to get event {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "create_event", skip(state, request), fields(title = %request.title))]
pub async fn create_event(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(request): ApiJson<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), ErrorResponse> {
    match state.event_service.create_event(&current, request).await {
        Ok(event) => {
            info!("Successfully created event {}", event.id);
            Ok((StatusCode::CREATED, Json(event)))
        }
        Err(err) => {
            error!("Failed to create event: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "update_event", skip(state, request), fields(event_id = %id))]
pub async fn update_event(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateEventRequest>,
) -> Result<Json<Event>, ErrorResponse> {
    match state.event_service.update_event(&current, id, request).await {
        Ok(event) => Ok(Json(event)),
        Err(err) => {
            error!("Failed to update event {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "delete_event", skip(state), fields(event_id = %id))]
pub async fn delete_event(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ErrorResponse> {
    match state.event_service.delete_event(&current, id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(err) => {
            error!("Failed to delete event {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}

/// The body is optional; without one a single seat is booked
#[instrument(name = "register_for_event", skip(state, request), fields(event_id = %id))]
pub async fn register(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    request: Option<Json<RegisterEventRequest>>,
) -> Result<(StatusCode, Json<EventRegistration>), ErrorResponse> {
    let request = request.map(|Json(request)| request).unwrap_or_default();

    match state.event_service.register(&current, id, request).await {
        Ok(registration) => Ok((StatusCode::CREATED, Json(registration))),
        Err(err) => {
            error!("Failed to register for event {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "unregister_from_event", skip(state), fields(event_id = %id))]
pub async fn unregister(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ErrorResponse> {
    match state.event_service.unregister(&current, id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(err) => {
            error!("Failed to unregister from event {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "list_event_registrations", skip(state), fields(event_id = %id))]
pub async fn list_registrations(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<EventRegistration>>, ErrorResponse> {
    match state.event_service.list_registrations(&current, id).await {
        Ok(registrations) => Ok(Json(registrations)),
        Err(err) => {
            error!("Failed to list registrations of event {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}
