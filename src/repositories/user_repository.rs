use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{info, instrument, Instrument};

use super::database::{db_span, parse_column, returned_row};
use crate::models::{NewUser, RepositoryResult, Role, User, UserFilters};

/// Trait defining the interface for account data access
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account; duplicate emails surface as a constraint violation
    async fn create(&self, user: NewUser) -> RepositoryResult<User>;

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>>;

    /// Lookup by the normalised email
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;

    async fn find_all(&self, filters: UserFilters) -> RepositoryResult<Vec<User>>;

    /// Persist name, phone and role
    async fn update(&self, user: User) -> RepositoryResult<User>;

    /// Returns false when no row was removed
    async fn delete(&self, id: i64) -> RepositoryResult<bool>;

    async fn count(&self) -> RepositoryResult<i64>;
}

/// SQLite implementation of the UserRepository trait
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "id, name, email, phone, role, password_hash, created_at, updated_at";

pub(crate) fn row_to_user(row: &SqliteRow) -> RepositoryResult<User> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        role: parse_column::<Role>(row, "role")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    #[instrument(skip(self, user), fields(email = %user.email, role = %user.role))]
    async fn create(&self, user: NewUser) -> RepositoryResult<User> {
        let now = Utc::now();
        let rows = sqlx::query(&format!(
            "INSERT INTO users (name, email, phone, role, password_hash, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .bind(now)
        .bind(now)
        .fetch_all(&self.pool)
        .instrument(db_span("INSERT", "users"))
        .await?;

        let created = row_to_user(&returned_row(rows)?)?;
        info!(user_id = created.id, "User created");
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", "users"))
            .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", "users"))
            .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    #[instrument(skip(self))]
    async fn find_all(&self, filters: UserFilters) -> RepositoryResult<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM users WHERE (?1 IS NULL OR role = ?1) ORDER BY id",
            USER_COLUMNS
        ))
        .bind(filters.role.map(|role| role.as_str()))
        .fetch_all(&self.pool)
        .instrument(db_span("SELECT", "users"))
        .await?;

        rows.iter().map(row_to_user).collect()
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    async fn update(&self, user: User) -> RepositoryResult<User> {
        let rows = sqlx::query(&format!(
            "UPDATE users SET name = ?, phone = ?, role = ?, updated_at = ? \
             WHERE id = ? RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&user.name)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(Utc::now())
        .bind(user.id)
        .fetch_all(&self.pool)
        .instrument(db_span("UPDATE", "users"))
        .await?;

        row_to_user(&returned_row(rows)?)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .instrument(db_span("DELETE", "users"))
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .instrument(db_span("SELECT", "users"))
            .await?;
        Ok(count)
    }
}
