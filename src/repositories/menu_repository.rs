use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{info, instrument, Instrument};

use super::database::{db_span, returned_row};
use crate::models::{
    from_cents, to_cents, CreateMenuCategoryRequest, CreateMenuItemRequest, MenuCategory,
    MenuItem, MenuItemFilters, RepositoryResult,
};

/// Trait defining the interface for menu data access
#[async_trait]
pub trait MenuRepository: Send + Sync {
    async fn find_categories(&self, restaurant_id: i64) -> RepositoryResult<Vec<MenuCategory>>;

    async fn find_category(&self, id: i64) -> RepositoryResult<Option<MenuCategory>>;

    async fn create_category(
        &self,
        request: CreateMenuCategoryRequest,
    ) -> RepositoryResult<MenuCategory>;

    async fn find_items(&self, filters: MenuItemFilters) -> RepositoryResult<Vec<MenuItem>>;

    async fn find_item(&self, id: i64) -> RepositoryResult<Option<MenuItem>>;

    /// Fetch several items at once, in no particular order
    async fn find_items_by_ids(&self, ids: &[i64]) -> RepositoryResult<Vec<MenuItem>>;

    async fn create_item(&self, request: CreateMenuItemRequest) -> RepositoryResult<MenuItem>;

    async fn update_item(&self, item: MenuItem) -> RepositoryResult<MenuItem>;

    async fn delete_item(&self, id: i64) -> RepositoryResult<bool>;
}

/// SQLite implementation of the MenuRepository trait
pub struct SqliteMenuRepository {
    pool: SqlitePool,
}

impl SqliteMenuRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const ITEM_COLUMNS: &str = "id, restaurant_id, category_id, name, description, price_cents, \
    image_url, is_available, created_at, updated_at";

fn row_to_category(row: &SqliteRow) -> RepositoryResult<MenuCategory> {
    Ok(MenuCategory {
        id: row.try_get("id")?,
        restaurant_id: row.try_get("restaurant_id")?,
        name: row.try_get("name")?,
        sort_order: row.try_get("sort_order")?,
    })
}

pub(crate) fn row_to_menu_item(row: &SqliteRow) -> RepositoryResult<MenuItem> {
    Ok(MenuItem {
        id: row.try_get("id")?,
        restaurant_id: row.try_get("restaurant_id")?,
        category_id: row.try_get("category_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: from_cents(row.try_get("price_cents")?),
        image_url: row.try_get("image_url")?,
        is_available: row.try_get("is_available")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl MenuRepository for SqliteMenuRepository {
    #[instrument(skip(self))]
    async fn find_categories(&self, restaurant_id: i64) -> RepositoryResult<Vec<MenuCategory>> {
        let rows = sqlx::query(
            "SELECT id, restaurant_id, name, sort_order FROM menu_categories \
             WHERE restaurant_id = ? ORDER BY sort_order, id",
        )
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .instrument(db_span("SELECT", "menu_categories"))
        .await?;

        rows.iter().map(row_to_category).collect()
    }

    #[instrument(skip(self))]
    async fn find_category(&self, id: i64) -> RepositoryResult<Option<MenuCategory>> {
        let row = sqlx::query(
            "SELECT id, restaurant_id, name, sort_order FROM menu_categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .instrument(db_span("SELECT", "menu_categories"))
        .await?;

        row.as_ref().map(row_to_category).transpose()
    }

    #[instrument(skip(self, request), fields(restaurant_id = request.restaurant_id))]
    async fn create_category(
        &self,
        request: CreateMenuCategoryRequest,
    ) -> RepositoryResult<MenuCategory> {
        let rows = sqlx::query(
            "INSERT INTO menu_categories (restaurant_id, name, sort_order) VALUES (?, ?, ?) \
             RETURNING id, restaurant_id, name, sort_order",
        )
        .bind(request.restaurant_id)
        .bind(request.name.trim())
        .bind(request.sort_order)
        .fetch_all(&self.pool)
        .instrument(db_span("INSERT", "menu_categories"))
        .await?;

        row_to_category(&returned_row(rows)?)
    }

    #[instrument(skip(self))]
    async fn find_items(&self, filters: MenuItemFilters) -> RepositoryResult<Vec<MenuItem>> {
        let search = filters
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let rows = sqlx::query(&format!(
            "SELECT {} FROM menu_items \
             WHERE (?1 IS NULL OR restaurant_id = ?1) \
               AND (?2 IS NULL OR category_id = ?2) \
               AND (?3 IS NULL OR name LIKE ?3 OR description LIKE ?3) \
               AND (?4 = 0 OR is_available = 1) \
             ORDER BY restaurant_id, category_id, name",
            ITEM_COLUMNS
        ))
        .bind(filters.restaurant_id)
        .bind(filters.category_id)
        .bind(search)
        .bind(filters.available_only)
        .fetch_all(&self.pool)
        .instrument(db_span("SELECT", "menu_items"))
        .await?;

        let items: Vec<MenuItem> = rows.iter().map(row_to_menu_item).collect::<Result<_, _>>()?;
        info!("Found {} menu items", items.len());
        Ok(items)
    }

    #[instrument(skip(self))]
    async fn find_item(&self, id: i64) -> RepositoryResult<Option<MenuItem>> {
        let row = sqlx::query(&format!("SELECT {} FROM menu_items WHERE id = ?", ITEM_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", "menu_items"))
            .await?;

        row.as_ref().map(row_to_menu_item).transpose()
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn find_items_by_ids(&self, ids: &[i64]) -> RepositoryResult<Vec<MenuItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM menu_items WHERE id IN ({})",
            ITEM_COLUMNS, placeholders
        );
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(*id);
        }

        let rows = query
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", "menu_items"))
            .await?;

        rows.iter().map(row_to_menu_item).collect()
    }

    #[instrument(skip(self, request), fields(restaurant_id = request.restaurant_id))]
    async fn create_item(&self, request: CreateMenuItemRequest) -> RepositoryResult<MenuItem> {
        let now = Utc::now();
        let rows = sqlx::query(&format!(
            "INSERT INTO menu_items (restaurant_id, category_id, name, description, price_cents, \
             image_url, is_available, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {}",
            ITEM_COLUMNS
        ))
        .bind(request.restaurant_id)
        .bind(request.category_id)
        .bind(request.name.trim())
        .bind(request.description.trim())
        .bind(to_cents(request.price))
        .bind(&request.image_url)
        .bind(request.is_available)
        .bind(now)
        .bind(now)
        .fetch_all(&self.pool)
        .instrument(db_span("INSERT", "menu_items"))
        .await?;

        let item = row_to_menu_item(&returned_row(rows)?)?;
        info!(menu_item_id = item.id, "Menu item created");
        Ok(item)
    }

    #[instrument(skip(self, item), fields(menu_item_id = item.id))]
    async fn update_item(&self, item: MenuItem) -> RepositoryResult<MenuItem> {
        let rows = sqlx::query(&format!(
            "UPDATE menu_items SET category_id = ?, name = ?, description = ?, price_cents = ?, \
             image_url = ?, is_available = ?, updated_at = ? WHERE id = ? RETURNING {}",
            ITEM_COLUMNS
        ))
        .bind(item.category_id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(to_cents(item.price))
        .bind(&item.image_url)
        .bind(item.is_available)
        .bind(item.updated_at)
        .bind(item.id)
        .fetch_all(&self.pool)
        .instrument(db_span("UPDATE", "menu_items"))
        .await?;

        row_to_menu_item(&returned_row(rows)?)
    }

    #[instrument(skip(self))]
    async fn delete_item(&self, id: i64) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM menu_items WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .instrument(db_span("DELETE", "menu_items"))
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
