use std::sync::Arc;
use tracing::{info, instrument};

use super::restaurant_service::active_restaurant;
use super::user_service::require_moderator;
use crate::models::{
    CreateReviewRequest, CurrentUser, RepositoryError, Review, ReviewFilters, ReviewStatus,
    ServiceError, ServiceResult, Validate,
};
use crate::observability::{BusinessDomain, BusinessTracingMiddleware};
use crate::repositories::{RestaurantRepository, ReviewRepository};

/// Reviews and their moderation
pub struct ReviewService {
    reviews: Arc<dyn ReviewRepository>,
    restaurants: Arc<dyn RestaurantRepository>,
    tracing: BusinessTracingMiddleware,
}

impl ReviewService {
    pub fn new(
        reviews: Arc<dyn ReviewRepository>,
        restaurants: Arc<dyn RestaurantRepository>,
        tracing: BusinessTracingMiddleware,
    ) -> Self {
        Self {
            reviews,
            restaurants,
            tracing,
        }
    }

    /// New reviews wait for moderation before they count towards the rating
    #[instrument(skip(self, request), fields(user_id = current.id))]
    pub async fn create_review(
        &self,
        current: &CurrentUser,
        restaurant_id: i64,
        request: CreateReviewRequest,
    ) -> ServiceResult<Review> {
        self.tracing
            .trace(
                BusinessDomain::Review,
                "create",
                self.insert_review(current, restaurant_id, request),
            )
            .await
    }

    #[instrument(skip(self))]
    pub async fn list_restaurant_reviews(&self, restaurant_id: i64) -> ServiceResult<Vec<Review>> {
        active_restaurant(self.restaurants.as_ref(), restaurant_id).await?;

        Ok(self
            .reviews
            .find_all(ReviewFilters {
                restaurant_id: Some(restaurant_id),
                status: Some(ReviewStatus::Approved),
            })
            .await?)
    }

    #[instrument(skip(self), fields(user_id = current.id))]
    pub async fn list_reviews(
        &self,
        current: &CurrentUser,
        filters: ReviewFilters,
    ) -> ServiceResult<Vec<Review>> {
        require_moderator(current)?;
        Ok(self.reviews.find_all(filters).await?)
    }

    #[instrument(skip(self), fields(moderator_id = current.id))]
    pub async fn moderate(
        &self,
        current: &CurrentUser,
        id: i64,
        status: ReviewStatus,
    ) -> ServiceResult<Review> {
        self.tracing
            .trace(BusinessDomain::Review, "moderate", async move {
                require_moderator(current)?;

                if status == ReviewStatus::Pending {
                    return Err(ServiceError::ValidationError {
                        message: "Moderation status must be approved or rejected".to_string(),
                    });
                }

                let review = self
                    .reviews
                    .moderate(id, status, current.id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("Review", id))?;

                crate::info_with_trace!(review_id = id, status = %status, "Review moderated");
                Ok::<_, ServiceError>(review)
            })
            .await
    }

    #[instrument(skip(self), fields(user_id = current.id))]
    pub async fn delete_review(&self, current: &CurrentUser, id: i64) -> ServiceResult<()> {
        let review = self
            .reviews
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Review", id))?;

        if !review.can_be_deleted_by(current) {
            return Err(ServiceError::forbidden("Only the author or a moderator may delete a review"));
        }

        if !self.reviews.delete(id).await? {
            return Err(ServiceError::not_found("Review", id));
        }

        info!(review_id = id, "Review deleted");
        Ok(())
    }

    async fn insert_review(
        &self,
        current: &CurrentUser,
        restaurant_id: i64,
        request: CreateReviewRequest,
    ) -> ServiceResult<Review> {
        request.validate()?;
        active_restaurant(self.restaurants.as_ref(), restaurant_id).await?;

        let review = self
            .reviews
            .create(current.id, restaurant_id, request)
            .await
            .map_err(|e| match e {
                RepositoryError::ConstraintViolation { .. } => ServiceError::conflict(
                    "You have already reviewed this restaurant",
                ),
                other => other.into(),
            })?;

        crate::info_with_trace!(review_id = review.id, rating = review.rating, "Review submitted");
        Ok(review)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::observability::Metrics;
    use crate::services::restaurant_service::tests::{restaurant, MockTestRestaurantRepository};
    use async_trait::async_trait;
    use chrono::Utc;
    use mockall::{mock, predicate::*};

    mock! {
        TestReviewRepository {}

        #[async_trait]
        impl ReviewRepository for TestReviewRepository {
            async fn create(&self, user_id: i64, restaurant_id: i64, request: CreateReviewRequest) -> Result<Review, RepositoryError>;
            async fn find_by_id(&self, id: i64) -> Result<Option<Review>, RepositoryError>;
            async fn find_all(&self, filters: ReviewFilters) -> Result<Vec<Review>, RepositoryError>;
            async fn moderate(&self, id: i64, status: ReviewStatus, moderator_id: i64) -> Result<Option<Review>, RepositoryError>;
            async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;
        }
    }

    fn actor(id: i64, role: Role) -> CurrentUser {
        CurrentUser {
            id,
            email: format!("{}@example.com", id),
            role,
        }
    }

    fn review(id: i64, user_id: i64, status: ReviewStatus) -> Review {
        Review {
            id,
            user_id,
            restaurant_id: 1,
            author_name: "Ada".to_string(),
            rating: 4,
            comment: "Good pasta".to_string(),
            status,
            moderated_by: None,
            moderated_at: None,
            created_at: Utc::now(),
        }
    }

    fn open_restaurants() -> MockTestRestaurantRepository {
        let mut restaurants = MockTestRestaurantRepository::new();
        restaurants
            .expect_find_by_id()
            .returning(|id| Ok(Some(restaurant(id, true))));
        restaurants
    }

    fn service(
        reviews: MockTestReviewRepository,
        restaurants: MockTestRestaurantRepository,
    ) -> ReviewService {
        ReviewService::new(
            Arc::new(reviews),
            Arc::new(restaurants),
            BusinessTracingMiddleware::new(Arc::new(Metrics::new().unwrap())),
        )
    }

    #[tokio::test]
    async fn test_duplicate_review_is_conflict() {
        let mut reviews = MockTestReviewRepository::new();
        reviews.expect_create().returning(|_, _, _| {
            Err(RepositoryError::ConstraintViolation {
                message: "UNIQUE constraint failed".to_string(),
            })
        });

        let result = service(reviews, open_restaurants())
            .create_review(
                &actor(10, Role::User),
                1,
                CreateReviewRequest {
                    rating: 5,
                    comment: "Again".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(ServiceError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_invalid_rating() {
        let mut reviews = MockTestReviewRepository::new();
        reviews.expect_create().never();

        let result = service(reviews, MockTestRestaurantRepository::new())
            .create_review(
                &actor(10, Role::User),
                1,
                CreateReviewRequest {
                    rating: 6,
                    comment: String::new(),
                },
            )
            .await;

        assert!(matches!(result, Err(ServiceError::ValidationError { .. })));
    }

    #[tokio::test]
    async fn test_public_listing_is_approved_only() {
        let mut reviews = MockTestReviewRepository::new();
        reviews
            .expect_find_all()
            .withf(|f| f.restaurant_id == Some(1) && f.status == Some(ReviewStatus::Approved))
            .returning(|_| Ok(vec![review(1, 10, ReviewStatus::Approved)]));

        let listed = service(reviews, open_restaurants())
            .list_restaurant_reviews(1)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_moderation_rules() {
        let mut reviews = MockTestReviewRepository::new();
        reviews
            .expect_moderate()
            .with(eq(1), eq(ReviewStatus::Approved), eq(2))
            .returning(|id, status, moderator| {
                let mut moderated = review(id, 10, status);
                moderated.moderated_by = Some(moderator);
                Ok(Some(moderated))
            });
        let service = service(reviews, MockTestRestaurantRepository::new());

        let user = service
            .moderate(&actor(10, Role::User), 1, ReviewStatus::Approved)
            .await;
        assert!(matches!(user, Err(ServiceError::Forbidden { .. })));

        let back_to_pending = service
            .moderate(&actor(2, Role::Moderator), 1, ReviewStatus::Pending)
            .await;
        assert!(matches!(
            back_to_pending,
            Err(ServiceError::ValidationError { .. })
        ));

        let approved = service
            .moderate(&actor(2, Role::Moderator), 1, ReviewStatus::Approved)
            .await
            .unwrap();
        assert_eq!(approved.moderated_by, Some(2));
    }

    #[tokio::test]
    async fn test_only_author_or_moderator_deletes() {
        let mut reviews = MockTestReviewRepository::new();
        reviews
            .expect_find_by_id()
            .returning(|id| Ok(Some(review(id, 10, ReviewStatus::Approved))));
        reviews.expect_delete().times(1).returning(|_| Ok(true));
        let service = service(reviews, MockTestRestaurantRepository::new());

        let stranger = service.delete_review(&actor(11, Role::User), 1).await;
        assert!(matches!(stranger, Err(ServiceError::Forbidden { .. })));

        service
            .delete_review(&actor(10, Role::User), 1)
            .await
            .unwrap();
    }
}
