use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::config::DatabaseConfig;
use crate::models::{RepositoryError, RepositoryResult};

/// Owns the SQLite pool and the schema lifecycle
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    url: String,
}

impl Database {
    /// Connect using the configured URL, optionally wiping the file first
    #[instrument(skip(config), fields(url = %config.database_url))]
    pub async fn from_config(config: &DatabaseConfig) -> RepositoryResult<Self> {
        if config.recreate_on_startup {
            remove_database_file(&config.database_url)?;
        }
        let database = Self::connect(&config.database_url, config.max_connections).await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Open a pool against `url`; in-memory databases get a single pinned connection
    pub async fn connect(url: &str, max_connections: u32) -> RepositoryResult<Self> {
        let normalized = prepare_sqlite_url(url);
        let in_memory = is_memory_url(&normalized);

        let mut options = SqliteConnectOptions::from_str(&normalized)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool_options = if in_memory {
            // Every new connection to :memory: would see an empty database
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await?;
        info!(url = %normalized, in_memory, "Connected to SQLite");

        Ok(Self {
            pool,
            url: normalized,
        })
    }

    /// In-memory database with the schema applied, for tests and benches
    pub async fn in_memory() -> RepositoryResult<Self> {
        let database = Self::connect("sqlite::memory:", 1).await?;
        database.migrate().await?;
        Ok(database)
    }

    #[instrument(skip(self))]
    pub async fn migrate(&self) -> RepositoryResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Lightweight liveness probe used by the health endpoint
    pub async fn ping(&self) -> RepositoryResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn is_memory_url(url: &str) -> bool {
    url.starts_with("sqlite::memory") || url.contains("mode=memory")
}

/// Normalise a SQLite URL: expand `~/`, create the parent directory, prefer `sqlite://`
pub(crate) fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || is_memory_url(url) {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path_with_query, None),
    };

    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded = expand_home(path_part);
    if let Some(parent) = expanded.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("Could not create database directory {}: {}", parent.display(), e);
            }
        }
    }

    let mut rebuilt = format!("sqlite://{}", expanded.display());
    if let Some(query) = query_part {
        rebuilt.push('?');
        rebuilt.push_str(query);
    }
    rebuilt
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}

fn database_file_path(url: &str) -> Option<PathBuf> {
    if is_memory_url(url) {
        return None;
    }
    let rest = url.strip_prefix("sqlite:")?;
    let path = rest.strip_prefix("//").unwrap_or(rest);
    let path = path.split_once('?').map(|(p, _)| p).unwrap_or(path);
    if path.is_empty() {
        None
    } else {
        Some(expand_home(path))
    }
}

/// Delete the database file and its WAL side files
fn remove_database_file(url: &str) -> RepositoryResult<()> {
    let Some(path) = database_file_path(url) else {
        return Ok(());
    };

    for suffix in ["", "-wal", "-shm"] {
        let mut candidate = path.clone().into_os_string();
        candidate.push(suffix);
        let candidate = PathBuf::from(candidate);
        match std::fs::remove_file(&candidate) {
            Ok(()) => info!("Removed {}", candidate.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(RepositoryError::Database {
                    message: format!("failed to remove {}: {}", candidate.display(), e),
                })
            }
        }
    }
    Ok(())
}

/// Span for a single SQL statement, named after the table it touches
pub(crate) fn db_span(operation: &'static str, table: &'static str) -> tracing::Span {
    tracing::info_span!(
        "SQLite",
        "db.system" = "sqlite",
        "db.operation" = operation,
        "db.sql.table" = table,
        "otel.kind" = "client",
        "otel.name" = format!("SQLite.{} {}", operation, table),
    )
}

/// Single row produced by a `RETURNING` write.
///
/// Writes are read with `fetch_all` so the statement steps to completion and its
/// autocommit transaction ends before the connection goes back to the pool.
pub(crate) fn returned_row<T>(rows: Vec<T>) -> RepositoryResult<T> {
    rows.into_iter().next().ok_or(RepositoryError::NotFound)
}

/// Decode a TEXT column into one of the domain enums
pub(crate) fn parse_column<T>(row: &SqliteRow, column: &str) -> RepositoryResult<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>()
        .map_err(|message| RepositoryError::InvalidData { message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_sqlite_url_memory_untouched() {
        assert_eq!(prepare_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            prepare_sqlite_url("sqlite:file:x?mode=memory&cache=shared"),
            "sqlite:file:x?mode=memory&cache=shared"
        );
    }

    #[test]
    fn test_prepare_sqlite_url_keeps_query() {
        let dir = std::env::temp_dir().join("restaurant-rs-url-test");
        let url = format!("sqlite:{}/db.sqlite?mode=rwc", dir.display());
        let prepared = prepare_sqlite_url(&url);

        assert!(prepared.starts_with("sqlite://"));
        assert!(prepared.ends_with("db.sqlite?mode=rwc"));
        assert!(dir.exists());
    }

    #[test]
    fn test_database_file_path() {
        assert_eq!(database_file_path("sqlite::memory:"), None);
        assert_eq!(
            database_file_path("sqlite://data/restaurant.db?mode=rwc"),
            Some(PathBuf::from("data/restaurant.db"))
        );
    }

    #[tokio::test]
    async fn test_in_memory_database_migrates() {
        let database = Database::in_memory().await.unwrap();
        database.ping().await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM restaurants")
            .fetch_one(database.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
