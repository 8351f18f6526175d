use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;
use tracing::{error, info, instrument};

use super::error::{service_error_to_response, ErrorResponse};
use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::app::AppState;
use crate::models::{
    CreateReviewRequest, CurrentUser, ModerateReviewRequest, Review, ReviewFilters,
    ReviewListResponse, ReviewStatus,
};

/// Query parameters for the moderation queue
#[derive(Debug, Deserialize)]
pub struct ListReviewsQuery {
    pub restaurant_id: Option<i64>,
    pub status: Option<ReviewStatus>,
}

#[instrument(name = "list_restaurant_reviews", skip(state), fields(restaurant_id = %id))]
pub async fn list_restaurant_reviews(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ReviewListResponse>, ErrorResponse> {
    match state.review_service.list_restaurant_reviews(id).await {
        Ok(reviews) => Ok(Json(ReviewListResponse {
            total_count: reviews.len(),
            reviews,
        })),
        Err(err) => {
            error!("Failed to list reviews of restaurant {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "create_review", skip(state, request), fields(
    restaurant_id = %id,
    rating = %request.rating,
))]
pub async fn create_review(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), ErrorResponse> {
    match state
        .review_service
        .create_review(&current, id, request)
        .await
    {
        Ok(review) => {
            info!("Review {} awaiting moderation", review.id);
            Ok((StatusCode::CREATED, Json(review)))
        }
        Err(err) => {
            error!("Failed to create review: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "list_reviews", skip(state))]
pub async fn list_reviews(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiQuery(query): ApiQuery<ListReviewsQuery>,
) -> Result<Json<ReviewListResponse>, ErrorResponse> {
    let filters = ReviewFilters {
        restaurant_id: query.restaurant_id,
        status: query.status,
    };

    match state.review_service.list_reviews(&current, filters).await {
        Ok(reviews) => Ok(Json(ReviewListResponse {
            total_count: reviews.len(),
            reviews,
        })),
        Err(err) => {
            error!("Failed to list reviews: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "moderate_review", skip(state, request), fields(
    review_id = %id,
    status = %request.status,
))]
pub async fn moderate_review(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<ModerateReviewRequest>,
) -> Result<Json<Review>, ErrorResponse> {
    match state
        .review_service
        .moderate(&current, id, request.status)
        .await
    {
        Ok(review) => Ok(Json(review)),
        Err(err) => {
            error!("Failed to moderate review {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}

#[instrument(name = "delete_review", skip(state), fields(review_id = %id))]
pub async fn delete_review(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ErrorResponse> {
    match state.review_service.delete_review(&current, id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(err) => {
            error!("Failed to delete review {}: {}", id, err);
            Err(service_error_to_response(err))
        }
    }
}
