use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{info, instrument, warn, Instrument};

use super::database::{db_span, returned_row};
use crate::models::{
    from_cents, to_cents, CreateEventRequest, Event, EventFilters, EventRegistration,
    RegistrationOutcome, RepositoryError, RepositoryResult,
};

/// Trait defining the interface for event and registration data access
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Events ordered by date; `now` is the cut-off for `upcoming_only`
    async fn find_all(
        &self,
        filters: EventFilters,
        now: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Event>>;

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Event>>;

    async fn create(&self, request: CreateEventRequest) -> RepositoryResult<Event>;

    async fn update(&self, event: Event) -> RepositoryResult<Event>;

    async fn delete(&self, id: i64) -> RepositoryResult<bool>;

    /// Insert a registration only if the remaining capacity covers `guests`
    async fn register(
        &self,
        event_id: i64,
        user_id: i64,
        guests: u32,
    ) -> RepositoryResult<RegistrationOutcome>;

    async fn unregister(&self, event_id: i64, user_id: i64) -> RepositoryResult<bool>;

    async fn find_registrations(&self, event_id: i64) -> RepositoryResult<Vec<EventRegistration>>;
}

/// SQLite implementation of the EventRepository trait
pub struct SqliteEventRepository {
    pool: SqlitePool,
}

impl SqliteEventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const EVENT_SELECT: &str = "SELECT e.id, e.restaurant_id, e.title, e.description, e.event_date, \
    e.capacity, e.price_cents, e.image_url, e.created_at, \
    COALESCE((SELECT SUM(r.guests) FROM event_registrations r WHERE r.event_id = e.id), 0) \
    AS registered_count \
    FROM events e";

const REGISTRATION_COLUMNS: &str = "id, event_id, user_id, guests, created_at";

fn row_to_event(row: &SqliteRow) -> RepositoryResult<Event> {
    Ok(Event {
        id: row.try_get("id")?,
        restaurant_id: row.try_get("restaurant_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        event_date: row.try_get("event_date")?,
        capacity: row.try_get("capacity")?,
        price: from_cents(row.try_get("price_cents")?),
        image_url: row.try_get("image_url")?,
        registered_count: row.try_get("registered_count")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_registration(row: &SqliteRow) -> RepositoryResult<EventRegistration> {
    Ok(EventRegistration {
        id: row.try_get("id")?,
        event_id: row.try_get("event_id")?,
        user_id: row.try_get("user_id")?,
        guests: row.try_get("guests")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl EventRepository for SqliteEventRepository {
    #[instrument(skip(self))]
    async fn find_all(
        &self,
        filters: EventFilters,
        now: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Event>> {
        let rows = sqlx::query(&format!(
            "{} WHERE (?1 IS NULL OR e.restaurant_id = ?1) AND (?2 = 0 OR e.event_date > ?3) \
             ORDER BY e.event_date, e.id",
            EVENT_SELECT
        ))
        .bind(filters.restaurant_id)
        .bind(filters.upcoming_only)
        .bind(now)
        .fetch_all(&self.pool)
        .instrument(db_span("SELECT", "events"))
        .await?;

        rows.iter().map(row_to_event).collect()
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Event>> {
        let row = sqlx::query(&format!("{} WHERE e.id = ?", EVENT_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", "events"))
            .await?;

        row.as_ref().map(row_to_event).transpose()
    }

    #[instrument(skip(self, request), fields(title = %request.title))]
    async fn create(&self, request: CreateEventRequest) -> RepositoryResult<Event> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "INSERT INTO events (restaurant_id, title, description, event_date, capacity, \
             price_cents, image_url, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(request.restaurant_id)
        .bind(request.title.trim())
        .bind(request.description.trim())
        .bind(request.event_date)
        .bind(request.capacity)
        .bind(to_cents(request.price))
        .bind(&request.image_url)
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .instrument(db_span("INSERT", "events"))
        .await?;
        let id = returned_row(ids)?;

        info!(event_id = id, "Event created");
        self.find_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    #[instrument(skip(self, event), fields(event_id = event.id))]
    async fn update(&self, event: Event) -> RepositoryResult<Event> {
        let result = sqlx::query(
            "UPDATE events SET title = ?, description = ?, event_date = ?, capacity = ?, \
             price_cents = ?, image_url = ? WHERE id = ?",
        )
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.event_date)
        .bind(event.capacity)
        .bind(to_cents(event.price))
        .bind(&event.image_url)
        .bind(event.id)
        .execute(&self.pool)
        .instrument(db_span("UPDATE", "events"))
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.find_by_id(event.id).await?.ok_or(RepositoryError::NotFound)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .instrument(db_span("DELETE", "events"))
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn register(
        &self,
        event_id: i64,
        user_id: i64,
        guests: u32,
    ) -> RepositoryResult<RegistrationOutcome> {
        // The capacity check and the insert are one statement
        let inserted = sqlx::query(&format!(
            "INSERT INTO event_registrations (event_id, user_id, guests, created_at) \
             SELECT ?1, ?2, ?3, ?4 \
             WHERE (SELECT capacity FROM events WHERE id = ?1) \
                 - COALESCE((SELECT SUM(guests) FROM event_registrations WHERE event_id = ?1), 0) \
                 >= ?3 \
             RETURNING {}",
            REGISTRATION_COLUMNS
        ))
        .bind(event_id)
        .bind(user_id)
        .bind(guests)
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .instrument(db_span("INSERT", "event_registrations"))
        .await;

        let rows = match inserted {
            Ok(rows) => rows,
            Err(e) => match RepositoryError::from(e) {
                RepositoryError::ConstraintViolation { .. } => {
                    return Ok(RegistrationOutcome::AlreadyRegistered)
                }
                other => return Err(other),
            },
        };

        if let Some(row) = rows.first() {
            let registration = row_to_registration(row)?;
            info!(event_id, user_id, guests, "Registered for event");
            return Ok(RegistrationOutcome::Registered(registration));
        }

        // Nothing was inserted; an existing registration wins over a full event
        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM event_registrations WHERE event_id = ? AND user_id = ?",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .instrument(db_span("SELECT", "event_registrations"))
        .await?;
        if existing.is_some() {
            return Ok(RegistrationOutcome::AlreadyRegistered);
        }

        let remaining: i64 = sqlx::query_scalar(
            "SELECT e.capacity - COALESCE(SUM(r.guests), 0) FROM events e \
             LEFT JOIN event_registrations r ON r.event_id = e.id \
             WHERE e.id = ? GROUP BY e.id",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .instrument(db_span("SELECT", "events"))
        .await?
        .unwrap_or(0);
        warn!(event_id, guests, remaining, "Event capacity exceeded");
        Ok(RegistrationOutcome::CapacityExceeded {
            remaining: u32::try_from(remaining.max(0)).unwrap_or(0),
        })
    }

    #[instrument(skip(self))]
    async fn unregister(&self, event_id: i64, user_id: i64) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM event_registrations WHERE event_id = ? AND user_id = ?")
            .bind(event_id)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(db_span("DELETE", "event_registrations"))
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn find_registrations(&self, event_id: i64) -> RepositoryResult<Vec<EventRegistration>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM event_registrations WHERE event_id = ? ORDER BY created_at, id",
            REGISTRATION_COLUMNS
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .instrument(db_span("SELECT", "event_registrations"))
        .await?;

        rows.iter().map(row_to_registration).collect()
    }
}
