use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{info, instrument, Instrument};

use super::database::{db_span, parse_column, returned_row};
use crate::models::{
    CreateReviewRequest, RepositoryError, RepositoryResult, Review, ReviewFilters, ReviewStatus,
};

/// Trait defining the interface for review data access
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// One review per user and restaurant; a second one is a constraint violation
    async fn create(
        &self,
        user_id: i64,
        restaurant_id: i64,
        request: CreateReviewRequest,
    ) -> RepositoryResult<Review>;

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Review>>;

    /// Newest first
    async fn find_all(&self, filters: ReviewFilters) -> RepositoryResult<Vec<Review>>;

    async fn moderate(
        &self,
        id: i64,
        status: ReviewStatus,
        moderator_id: i64,
    ) -> RepositoryResult<Option<Review>>;

    async fn delete(&self, id: i64) -> RepositoryResult<bool>;
}

/// SQLite implementation of the ReviewRepository trait
pub struct SqliteReviewRepository {
    pool: SqlitePool,
}

impl SqliteReviewRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const REVIEW_SELECT: &str = "SELECT v.id, v.user_id, v.restaurant_id, u.name AS author_name, \
    v.rating, v.comment, v.status, v.moderated_by, v.moderated_at, v.created_at \
    FROM reviews v JOIN users u ON u.id = v.user_id";

fn row_to_review(row: &SqliteRow) -> RepositoryResult<Review> {
    Ok(Review {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        restaurant_id: row.try_get("restaurant_id")?,
        author_name: row.try_get("author_name")?,
        rating: row.try_get("rating")?,
        comment: row.try_get("comment")?,
        status: parse_column::<ReviewStatus>(row, "status")?,
        moderated_by: row.try_get("moderated_by")?,
        moderated_at: row.try_get("moderated_at")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl ReviewRepository for SqliteReviewRepository {
    #[instrument(skip(self, request))]
    async fn create(
        &self,
        user_id: i64,
        restaurant_id: i64,
        request: CreateReviewRequest,
    ) -> RepositoryResult<Review> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "INSERT INTO reviews (user_id, restaurant_id, rating, comment, status, created_at) \
             VALUES (?, ?, ?, ?, 'pending', ?) RETURNING id",
        )
        .bind(user_id)
        .bind(restaurant_id)
        .bind(request.rating)
        .bind(request.comment.trim())
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .instrument(db_span("INSERT", "reviews"))
        .await?;
        let id = returned_row(ids)?;

        info!(review_id = id, "Review created");
        self.find_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Review>> {
        let row = sqlx::query(&format!("{} WHERE v.id = ?", REVIEW_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", "reviews"))
            .await?;

        row.as_ref().map(row_to_review).transpose()
    }

    #[instrument(skip(self))]
    async fn find_all(&self, filters: ReviewFilters) -> RepositoryResult<Vec<Review>> {
        let rows = sqlx::query(&format!(
            "{} WHERE (?1 IS NULL OR v.restaurant_id = ?1) AND (?2 IS NULL OR v.status = ?2) \
             ORDER BY v.created_at DESC, v.id DESC",
            REVIEW_SELECT
        ))
        .bind(filters.restaurant_id)
        .bind(filters.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .instrument(db_span("SELECT", "reviews"))
        .await?;

        rows.iter().map(row_to_review).collect()
    }

    #[instrument(skip(self))]
    async fn moderate(
        &self,
        id: i64,
        status: ReviewStatus,
        moderator_id: i64,
    ) -> RepositoryResult<Option<Review>> {
        let result = sqlx::query(
            "UPDATE reviews SET status = ?, moderated_by = ?, moderated_at = ? WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(moderator_id)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .instrument(db_span("UPDATE", "reviews"))
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .instrument(db_span("DELETE", "reviews"))
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
