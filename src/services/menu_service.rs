use std::sync::Arc;
use tracing::{info, instrument};

use super::restaurant_service::active_restaurant;
use super::user_service::require_staff;
use crate::models::{
    CreateMenuCategoryRequest, CreateMenuItemRequest, CurrentUser, MenuCategory, MenuItem,
    MenuItemFilters, MenuResponse, RepositoryError, ServiceError, ServiceResult,
    UpdateMenuItemRequest, Validate,
};
use crate::repositories::{MenuRepository, RestaurantRepository};

/// Menus, categories and menu items
pub struct MenuService {
    menu: Arc<dyn MenuRepository>,
    restaurants: Arc<dyn RestaurantRepository>,
}

impl MenuService {
    pub fn new(menu: Arc<dyn MenuRepository>, restaurants: Arc<dyn RestaurantRepository>) -> Self {
        Self { menu, restaurants }
    }

    /// Categories with their available items, plus items without a category
    #[instrument(skip(self))]
    pub async fn get_menu(&self, restaurant_id: i64) -> ServiceResult<MenuResponse> {
        active_restaurant(self.restaurants.as_ref(), restaurant_id).await?;

        let categories = self.menu.find_categories(restaurant_id).await?;
        let items = self
            .menu
            .find_items(MenuItemFilters {
                restaurant_id: Some(restaurant_id),
                available_only: true,
                ..Default::default()
            })
            .await?;

        info!(
            restaurant_id,
            categories = categories.len(),
            items = items.len(),
            "Menu loaded"
        );
        Ok(MenuResponse::build(restaurant_id, categories, items))
    }

    #[instrument(skip(self))]
    pub async fn list_items(&self, filters: MenuItemFilters) -> ServiceResult<Vec<MenuItem>> {
        Ok(self.menu.find_items(filters).await?)
    }

    #[instrument(skip(self))]
    pub async fn get_item(&self, id: i64) -> ServiceResult<MenuItem> {
        self.menu
            .find_item(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Menu item", id))
    }

    #[instrument(skip(self, request), fields(user_id = current.id))]
    pub async fn create_category(
        &self,
        current: &CurrentUser,
        request: CreateMenuCategoryRequest,
    ) -> ServiceResult<MenuCategory> {
        require_staff(current)?;
        request.validate()?;
        self.existing_restaurant(request.restaurant_id).await?;

        let category = self.menu.create_category(request).await?;
        info!(category_id = category.id, "Menu category created");
        Ok(category)
    }

    #[instrument(skip(self, request), fields(user_id = current.id))]
    pub async fn create_item(
        &self,
        current: &CurrentUser,
        request: CreateMenuItemRequest,
    ) -> ServiceResult<MenuItem> {
        require_staff(current)?;
        request.validate()?;
        self.existing_restaurant(request.restaurant_id).await?;
        if let Some(category_id) = request.category_id {
            self.check_category(request.restaurant_id, category_id).await?;
        }

        let item = self.menu.create_item(request).await?;
        crate::info_with_trace!(menu_item_id = item.id, "Menu item created");
        Ok(item)
    }

    #[instrument(skip(self, request), fields(user_id = current.id))]
    pub async fn update_item(
        &self,
        current: &CurrentUser,
        id: i64,
        request: UpdateMenuItemRequest,
    ) -> ServiceResult<MenuItem> {
        require_staff(current)?;
        request.validate()?;

        let mut item = self.get_item(id).await?;
        if let Some(category_id) = request.category_id {
            self.check_category(item.restaurant_id, category_id).await?;
        }
        item.update(request);

        let updated = self.menu.update_item(item).await?;
        info!(menu_item_id = id, "Menu item updated");
        Ok(updated)
    }

    /// Items already ordered cannot be removed; mark them unavailable instead
    #[instrument(skip(self), fields(user_id = current.id))]
    pub async fn delete_item(&self, current: &CurrentUser, id: i64) -> ServiceResult<()> {
        require_staff(current)?;

        let deleted = self.menu.delete_item(id).await.map_err(|e| match e {
            RepositoryError::ForeignKeyViolation { .. } => ServiceError::conflict(
                "Menu item is referenced by existing orders; mark it unavailable instead",
            ),
            other => other.into(),
        })?;
        if !deleted {
            return Err(ServiceError::not_found("Menu item", id));
        }

        crate::info_with_trace!(menu_item_id = id, "Menu item deleted");
        Ok(())
    }

    async fn existing_restaurant(&self, id: i64) -> ServiceResult<()> {
        match self.restaurants.find_by_id(id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found("Restaurant", id)),
        }
    }

    async fn check_category(&self, restaurant_id: i64, category_id: i64) -> ServiceResult<()> {
        let category = self
            .menu
            .find_category(category_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Menu category", category_id))?;

        if category.restaurant_id != restaurant_id {
            return Err(ServiceError::ValidationError {
                message: format!(
                    "Category {} does not belong to restaurant {}",
                    category_id, restaurant_id
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::Role;
    use crate::services::restaurant_service::tests::{restaurant, MockTestRestaurantRepository};
    use async_trait::async_trait;
    use chrono::Utc;
    use mockall::{mock, predicate::*};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    mock! {
        pub TestMenuRepository {}

        #[async_trait]
        impl MenuRepository for TestMenuRepository {
            async fn find_categories(&self, restaurant_id: i64) -> Result<Vec<MenuCategory>, RepositoryError>;
            async fn find_category(&self, id: i64) -> Result<Option<MenuCategory>, RepositoryError>;
            async fn create_category(&self, request: CreateMenuCategoryRequest) -> Result<MenuCategory, RepositoryError>;
            async fn find_items(&self, filters: MenuItemFilters) -> Result<Vec<MenuItem>, RepositoryError>;
            async fn find_item(&self, id: i64) -> Result<Option<MenuItem>, RepositoryError>;
            async fn find_items_by_ids(&self, ids: &[i64]) -> Result<Vec<MenuItem>, RepositoryError>;
            async fn create_item(&self, request: CreateMenuItemRequest) -> Result<MenuItem, RepositoryError>;
            async fn update_item(&self, item: MenuItem) -> Result<MenuItem, RepositoryError>;
            async fn delete_item(&self, id: i64) -> Result<bool, RepositoryError>;
        }
    }

    pub(crate) fn menu_item(id: i64, restaurant_id: i64, price: Decimal) -> MenuItem {
        let now = Utc::now();
        MenuItem {
            id,
            restaurant_id,
            category_id: None,
            name: format!("Dish {}", id),
            description: String::new(),
            price,
            image_url: None,
            is_available: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn staff() -> CurrentUser {
        CurrentUser {
            id: 2,
            email: "staff@example.com".to_string(),
            role: Role::Staff,
        }
    }

    fn active_restaurants() -> MockTestRestaurantRepository {
        let mut restaurants = MockTestRestaurantRepository::new();
        restaurants
            .expect_find_by_id()
            .returning(|id| Ok(Some(restaurant(id, true))));
        restaurants
    }

    #[tokio::test]
    async fn test_get_menu_only_requests_available_items() {
        let mut menu = MockTestMenuRepository::new();
        menu.expect_find_categories()
            .with(eq(1))
            .returning(|_| Ok(vec![]));
        menu.expect_find_items()
            .withf(|f| f.restaurant_id == Some(1) && f.available_only)
            .returning(|_| Ok(vec![menu_item(5, 1, dec!(8.00))]));

        let service = MenuService::new(Arc::new(menu), Arc::new(active_restaurants()));
        let response = service.get_menu(1).await.unwrap();

        assert!(response.sections.is_empty());
        assert_eq!(response.uncategorized.len(), 1);
    }

    #[tokio::test]
    async fn test_create_item_rejects_foreign_category() {
        let mut menu = MockTestMenuRepository::new();
        menu.expect_find_category().with(eq(9)).returning(|id| {
            Ok(Some(MenuCategory {
                id,
                restaurant_id: 2,
                name: "Elsewhere".to_string(),
                sort_order: 0,
            }))
        });
        menu.expect_create_item().never();

        let service = MenuService::new(Arc::new(menu), Arc::new(active_restaurants()));
        let request = CreateMenuItemRequest {
            restaurant_id: 1,
            category_id: Some(9),
            name: "Soup".to_string(),
            description: String::new(),
            price: dec!(6.50),
            image_url: None,
            is_available: true,
        };

        let result = service.create_item(&staff(), request).await;
        assert!(matches!(result, Err(ServiceError::ValidationError { .. })));
    }

    #[tokio::test]
    async fn test_create_item_requires_staff() {
        let menu = MockTestMenuRepository::new();
        let service = MenuService::new(Arc::new(menu), Arc::new(active_restaurants()));
        let courier = CurrentUser {
            id: 4,
            email: "courier@example.com".to_string(),
            role: Role::Courier,
        };
        let request = CreateMenuItemRequest {
            restaurant_id: 1,
            category_id: None,
            name: "Soup".to_string(),
            description: String::new(),
            price: dec!(6.50),
            image_url: None,
            is_available: true,
        };

        let result = service.create_item(&courier, request).await;
        assert!(matches!(result, Err(ServiceError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_delete_ordered_item_is_conflict() {
        let mut menu = MockTestMenuRepository::new();
        menu.expect_delete_item().returning(|_| {
            Err(RepositoryError::ForeignKeyViolation {
                message: "FOREIGN KEY constraint failed".to_string(),
            })
        });

        let service = MenuService::new(Arc::new(menu), Arc::new(active_restaurants()));
        let result = service.delete_item(&staff(), 5).await;
        assert!(matches!(result, Err(ServiceError::Conflict { .. })));
    }
}
