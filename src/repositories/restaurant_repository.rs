use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{info, instrument, Instrument};

use super::database::{db_span, parse_column, returned_row};
use crate::models::{
    CreateRestaurantRequest, CreateTableRequest, DiningTable, RatingSummary, RepositoryResult,
    Restaurant, RestaurantFilters, RestaurantResponse, TableStatus,
};

/// Trait defining the interface for restaurant and dining table data access
#[async_trait]
pub trait RestaurantRepository: Send + Sync {
    /// List restaurants with their approved-review rating
    async fn find_all(&self, filters: RestaurantFilters) -> RepositoryResult<Vec<RestaurantResponse>>;

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Restaurant>>;

    async fn rating_summary(&self, id: i64) -> RepositoryResult<RatingSummary>;

    async fn create(&self, request: CreateRestaurantRequest) -> RepositoryResult<Restaurant>;

    async fn update(&self, restaurant: Restaurant) -> RepositoryResult<Restaurant>;

    /// Mark as inactive; returns false when the restaurant does not exist
    async fn soft_delete(&self, id: i64) -> RepositoryResult<bool>;

    async fn count(&self) -> RepositoryResult<i64>;

    async fn find_tables(&self, restaurant_id: i64) -> RepositoryResult<Vec<DiningTable>>;

    async fn find_table(&self, id: i64) -> RepositoryResult<Option<DiningTable>>;

    /// Table numbers are unique per restaurant
    async fn create_table(
        &self,
        restaurant_id: i64,
        request: CreateTableRequest,
    ) -> RepositoryResult<DiningTable>;

    async fn update_table_status(
        &self,
        id: i64,
        status: TableStatus,
    ) -> RepositoryResult<Option<DiningTable>>;

    async fn delete_table(&self, id: i64) -> RepositoryResult<bool>;
}

/// SQLite implementation of the RestaurantRepository trait
pub struct SqliteRestaurantRepository {
    pool: SqlitePool,
}

impl SqliteRestaurantRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const RESTAURANT_COLUMNS: &str = "id, name, description, address, phone, cuisine, \
    opening_hours, image_url, is_active, created_at, updated_at";

const TABLE_COLUMNS: &str = "id, restaurant_id, number, seats, status";

pub(crate) fn row_to_restaurant(row: &SqliteRow) -> RepositoryResult<Restaurant> {
    Ok(Restaurant {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        address: row.try_get("address")?,
        phone: row.try_get("phone")?,
        cuisine: row.try_get("cuisine")?,
        opening_hours: row.try_get("opening_hours")?,
        image_url: row.try_get("image_url")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_table(row: &SqliteRow) -> RepositoryResult<DiningTable> {
    Ok(DiningTable {
        id: row.try_get("id")?,
        restaurant_id: row.try_get("restaurant_id")?,
        number: row.try_get("number")?,
        seats: row.try_get("seats")?,
        status: parse_column::<TableStatus>(row, "status")?,
    })
}

fn like_pattern(search: &str) -> String {
    let escaped = search
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl RestaurantRepository for SqliteRestaurantRepository {
    #[instrument(skip(self))]
    async fn find_all(&self, filters: RestaurantFilters) -> RepositoryResult<Vec<RestaurantResponse>> {
        let search = filters
            .search
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(like_pattern);
        let cuisine = filters.cuisine.filter(|c| !c.trim().is_empty());

        let rows = sqlx::query(
            "SELECT r.id, r.name, r.description, r.address, r.phone, r.cuisine, \
                    r.opening_hours, r.image_url, r.is_active, r.created_at, r.updated_at, \
                    AVG(v.rating) AS average_rating, COUNT(v.id) AS review_count \
             FROM restaurants r \
             LEFT JOIN reviews v ON v.restaurant_id = r.id AND v.status = 'approved' \
             WHERE (?1 OR r.is_active = 1) \
               AND (?2 IS NULL OR r.name LIKE ?2 ESCAPE '\\' OR r.description LIKE ?2 ESCAPE '\\') \
               AND (?3 IS NULL OR lower(r.cuisine) = lower(?3)) \
             GROUP BY r.id \
             ORDER BY r.name, r.id",
        )
        .bind(filters.include_inactive)
        .bind(search)
        .bind(cuisine)
        .fetch_all(&self.pool)
        .instrument(db_span("SELECT", "restaurants"))
        .await?;

        let mut restaurants = Vec::with_capacity(rows.len());
        for row in &rows {
            restaurants.push(RestaurantResponse {
                restaurant: row_to_restaurant(row)?,
                average_rating: row.try_get("average_rating")?,
                review_count: row.try_get("review_count")?,
            });
        }

        info!("Found {} restaurants", restaurants.len());
        Ok(restaurants)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Restaurant>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM restaurants WHERE id = ?",
            RESTAURANT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .instrument(db_span("SELECT", "restaurants"))
        .await?;

        row.as_ref().map(row_to_restaurant).transpose()
    }

    #[instrument(skip(self))]
    async fn rating_summary(&self, id: i64) -> RepositoryResult<RatingSummary> {
        let row = sqlx::query(
            "SELECT AVG(rating) AS average_rating, COUNT(id) AS review_count \
             FROM reviews WHERE restaurant_id = ? AND status = 'approved'",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .instrument(db_span("SELECT", "reviews"))
        .await?;

        Ok(RatingSummary {
            average_rating: row.try_get("average_rating")?,
            review_count: row.try_get("review_count")?,
        })
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    async fn create(&self, request: CreateRestaurantRequest) -> RepositoryResult<Restaurant> {
        let now = Utc::now();
        let rows = sqlx::query(&format!(
            "INSERT INTO restaurants (name, description, address, phone, cuisine, opening_hours, \
             image_url, is_active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?) RETURNING {}",
            RESTAURANT_COLUMNS
        ))
        .bind(request.name.trim())
        .bind(request.description.trim())
        .bind(request.address.trim())
        .bind(&request.phone)
        .bind(&request.cuisine)
        .bind(&request.opening_hours)
        .bind(&request.image_url)
        .bind(now)
        .bind(now)
        .fetch_all(&self.pool)
        .instrument(db_span("INSERT", "restaurants"))
        .await?;

        let restaurant = row_to_restaurant(&returned_row(rows)?)?;
        info!(restaurant_id = restaurant.id, "Restaurant created");
        Ok(restaurant)
    }

    #[instrument(skip(self, restaurant), fields(restaurant_id = restaurant.id))]
    async fn update(&self, restaurant: Restaurant) -> RepositoryResult<Restaurant> {
        let rows = sqlx::query(&format!(
            "UPDATE restaurants SET name = ?, description = ?, address = ?, phone = ?, \
             cuisine = ?, opening_hours = ?, image_url = ?, is_active = ?, updated_at = ? \
             WHERE id = ? RETURNING {}",
            RESTAURANT_COLUMNS
        ))
        .bind(&restaurant.name)
        .bind(&restaurant.description)
        .bind(&restaurant.address)
        .bind(&restaurant.phone)
        .bind(&restaurant.cuisine)
        .bind(&restaurant.opening_hours)
        .bind(&restaurant.image_url)
        .bind(restaurant.is_active)
        .bind(restaurant.updated_at)
        .bind(restaurant.id)
        .fetch_all(&self.pool)
        .instrument(db_span("UPDATE", "restaurants"))
        .await?;

        row_to_restaurant(&returned_row(rows)?)
    }

    #[instrument(skip(self))]
    async fn soft_delete(&self, id: i64) -> RepositoryResult<bool> {
        let result = sqlx::query("UPDATE restaurants SET is_active = 0, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .instrument(db_span("UPDATE", "restaurants"))
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM restaurants")
            .fetch_one(&self.pool)
            .instrument(db_span("SELECT", "restaurants"))
            .await?;
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn find_tables(&self, restaurant_id: i64) -> RepositoryResult<Vec<DiningTable>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tables WHERE restaurant_id = ? ORDER BY number",
            TABLE_COLUMNS
        ))
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .instrument(db_span("SELECT", "tables"))
        .await?;

        rows.iter().map(row_to_table).collect()
    }

    #[instrument(skip(self))]
    async fn find_table(&self, id: i64) -> RepositoryResult<Option<DiningTable>> {
        let row = sqlx::query(&format!("SELECT {} FROM tables WHERE id = ?", TABLE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", "tables"))
            .await?;

        row.as_ref().map(row_to_table).transpose()
    }

    #[instrument(skip(self))]
    async fn create_table(
        &self,
        restaurant_id: i64,
        request: CreateTableRequest,
    ) -> RepositoryResult<DiningTable> {
        let rows = sqlx::query(&format!(
            "INSERT INTO tables (restaurant_id, number, seats, status) \
             VALUES (?, ?, ?, 'available') RETURNING {}",
            TABLE_COLUMNS
        ))
        .bind(restaurant_id)
        .bind(request.number)
        .bind(request.seats)
        .fetch_all(&self.pool)
        .instrument(db_span("INSERT", "tables"))
        .await?;

        row_to_table(&returned_row(rows)?)
    }

    #[instrument(skip(self))]
    async fn update_table_status(
        &self,
        id: i64,
        status: TableStatus,
    ) -> RepositoryResult<Option<DiningTable>> {
        let rows = sqlx::query(&format!(
            "UPDATE tables SET status = ? WHERE id = ? RETURNING {}",
            TABLE_COLUMNS
        ))
        .bind(status.as_str())
        .bind(id)
        .fetch_all(&self.pool)
        .instrument(db_span("UPDATE", "tables"))
        .await?;

        rows.first().map(row_to_table).transpose()
    }

    #[instrument(skip(self))]
    async fn delete_table(&self, id: i64) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM tables WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .instrument(db_span("DELETE", "tables"))
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
