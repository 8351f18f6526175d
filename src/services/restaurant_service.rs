use std::sync::Arc;
use tracing::{info, instrument};

use super::user_service::{require_admin, require_staff};
use crate::models::{
    CreateRestaurantRequest, CreateTableRequest, CurrentUser, DiningTable, RepositoryError,
    Restaurant, RestaurantFilters, RestaurantResponse, ServiceError, ServiceResult, TableStatus,
    UpdateRestaurantRequest, Validate,
};
use crate::repositories::RestaurantRepository;

pub struct RestaurantService {
    restaurants: Arc<dyn RestaurantRepository>,
}

impl RestaurantService {
    pub fn new(restaurants: Arc<dyn RestaurantRepository>) -> Self {
        Self { restaurants }
    }

    /// Inactive restaurants are only listed for administrators
    #[instrument(skip(self, current))]
    pub async fn list(
        &self,
        current: Option<&CurrentUser>,
        mut filters: RestaurantFilters,
    ) -> ServiceResult<Vec<RestaurantResponse>> {
        if filters.include_inactive && !current.is_some_and(CurrentUser::is_admin) {
            filters.include_inactive = false;
        }

        let restaurants = self.restaurants.find_all(filters).await?;
        info!(count = restaurants.len(), "Listed restaurants");
        Ok(restaurants)
    }

    #[instrument(skip(self, current))]
    pub async fn get(
        &self,
        current: Option<&CurrentUser>,
        id: i64,
    ) -> ServiceResult<RestaurantResponse> {
        let restaurant = self
            .restaurants
            .find_by_id(id)
            .await?
            .filter(|r| r.is_active || current.is_some_and(CurrentUser::is_admin))
            .ok_or_else(|| ServiceError::not_found("Restaurant", id))?;

        let rating = self.restaurants.rating_summary(id).await?;
        Ok(RestaurantResponse {
            restaurant,
            average_rating: rating.average_rating,
            review_count: rating.review_count,
        })
    }

    #[instrument(skip(self, request), fields(admin_id = current.id))]
    pub async fn create(
        &self,
        current: &CurrentUser,
        request: CreateRestaurantRequest,
    ) -> ServiceResult<Restaurant> {
        require_admin(current)?;
        request.validate()?;

        let restaurant = self.restaurants.create(request).await?;
        crate::info_with_trace!(restaurant_id = restaurant.id, "Restaurant created");
        Ok(restaurant)
    }

    #[instrument(skip(self, request), fields(admin_id = current.id))]
    pub async fn update(
        &self,
        current: &CurrentUser,
        id: i64,
        request: UpdateRestaurantRequest,
    ) -> ServiceResult<Restaurant> {
        require_admin(current)?;
        request.validate()?;

        let mut restaurant = self
            .restaurants
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Restaurant", id))?;
        restaurant.update(request);

        let updated = self.restaurants.update(restaurant).await?;
        info!(restaurant_id = id, "Restaurant updated");
        Ok(updated)
    }

    /// Soft delete; the restaurant's history stays queryable
    #[instrument(skip(self), fields(admin_id = current.id))]
    pub async fn delete(&self, current: &CurrentUser, id: i64) -> ServiceResult<()> {
        require_admin(current)?;

        if !self.restaurants.soft_delete(id).await? {
            return Err(ServiceError::not_found("Restaurant", id));
        }

        crate::info_with_trace!(restaurant_id = id, "Restaurant deactivated");
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = current.id))]
    pub async fn list_tables(
        &self,
        current: &CurrentUser,
        restaurant_id: i64,
    ) -> ServiceResult<Vec<DiningTable>> {
        require_staff(current)?;
        self.existing(restaurant_id).await?;
        Ok(self.restaurants.find_tables(restaurant_id).await?)
    }

    #[instrument(skip(self, request), fields(admin_id = current.id))]
    pub async fn create_table(
        &self,
        current: &CurrentUser,
        restaurant_id: i64,
        request: CreateTableRequest,
    ) -> ServiceResult<DiningTable> {
        require_admin(current)?;
        request.validate()?;
        self.existing(restaurant_id).await?;

        let number = request.number;
        let table = self
            .restaurants
            .create_table(restaurant_id, request)
            .await
            .map_err(|e| match e {
                RepositoryError::ConstraintViolation { .. } => ServiceError::conflict(format!(
                    "Table {} already exists in restaurant {}",
                    number, restaurant_id
                )),
                other => other.into(),
            })?;

        info!(table_id = table.id, restaurant_id, "Table created");
        Ok(table)
    }

    #[instrument(skip(self), fields(user_id = current.id))]
    pub async fn update_table_status(
        &self,
        current: &CurrentUser,
        table_id: i64,
        status: TableStatus,
    ) -> ServiceResult<DiningTable> {
        require_staff(current)?;

        let table = self
            .restaurants
            .update_table_status(table_id, status)
            .await?
            .ok_or_else(|| ServiceError::not_found("Table", table_id))?;

        info!(table_id, status = %status, "Table status updated");
        Ok(table)
    }

    #[instrument(skip(self), fields(admin_id = current.id))]
    pub async fn delete_table(&self, current: &CurrentUser, table_id: i64) -> ServiceResult<()> {
        require_admin(current)?;

        if !self.restaurants.delete_table(table_id).await? {
            return Err(ServiceError::not_found("Table", table_id));
        }

        info!(table_id, "Table deleted");
        Ok(())
    }

    async fn existing(&self, id: i64) -> ServiceResult<Restaurant> {
        self.restaurants
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Restaurant", id))
    }
}

/// Shared by the services that only accept work for open restaurants
pub(crate) async fn active_restaurant(
    restaurants: &dyn RestaurantRepository,
    id: i64,
) -> ServiceResult<Restaurant> {
    restaurants
        .find_by_id(id)
        .await?
        .filter(|r| r.is_active)
        .ok_or_else(|| ServiceError::not_found("Restaurant", id))
}
