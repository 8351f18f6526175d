use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{info, instrument, warn, Instrument};

use super::database::{db_span, parse_column, returned_row};
use super::StatusUpdate;
use crate::models::{
    Booking, BookingFilters, BookingStatus, CreateBookingRequest, RepositoryResult,
    BOOKING_SLOT_HOURS,
};

/// Trait defining the interface for booking data access
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create(&self, user_id: i64, request: CreateBookingRequest) -> RepositoryResult<Booking>;

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Booking>>;

    async fn find_all(&self, filters: BookingFilters) -> RepositoryResult<Vec<Booking>>;

    /// Compare-and-set the status. When `table_id` is given the table is assigned in the
    /// same transaction, after checking no other confirmed booking holds it in an
    /// overlapping slot.
    async fn update_status(
        &self,
        id: i64,
        expected: BookingStatus,
        next: BookingStatus,
        table_id: Option<i64>,
    ) -> RepositoryResult<StatusUpdate<Booking>>;
}

/// SQLite implementation of the BookingRepository trait
pub struct SqliteBookingRepository {
    pool: SqlitePool,
}

impl SqliteBookingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const BOOKING_COLUMNS: &str = "id, user_id, restaurant_id, table_id, booking_time, guests, \
    contact_name, contact_phone, notes, status, created_at, updated_at";

fn row_to_booking(row: &SqliteRow) -> RepositoryResult<Booking> {
    Ok(Booking {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        restaurant_id: row.try_get("restaurant_id")?,
        table_id: row.try_get("table_id")?,
        booking_time: row.try_get("booking_time")?,
        guests: row.try_get("guests")?,
        contact_name: row.try_get("contact_name")?,
        contact_phone: row.try_get("contact_phone")?,
        notes: row.try_get("notes")?,
        status: parse_column::<BookingStatus>(row, "status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Open interval of start times whose slot would intersect a slot starting at `start`
fn conflict_window(start: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let slot = Duration::hours(BOOKING_SLOT_HOURS);
    (start - slot, start + slot)
}

#[async_trait]
impl BookingRepository for SqliteBookingRepository {
    #[instrument(skip(self, request), fields(restaurant_id = request.restaurant_id))]
    async fn create(&self, user_id: i64, request: CreateBookingRequest) -> RepositoryResult<Booking> {
        let now = Utc::now();
        let rows = sqlx::query(&format!(
            "INSERT INTO bookings (user_id, restaurant_id, table_id, booking_time, guests, \
             contact_name, contact_phone, notes, status, created_at, updated_at) \
             VALUES (?, ?, NULL, ?, ?, ?, ?, ?, 'pending', ?, ?) RETURNING {}",
            BOOKING_COLUMNS
        ))
        .bind(user_id)
        .bind(request.restaurant_id)
        .bind(request.booking_time)
        .bind(request.guests)
        .bind(request.contact_name.trim())
        .bind(request.contact_phone.trim())
        .bind(&request.notes)
        .bind(now)
        .bind(now)
        .fetch_all(&self.pool)
        .instrument(db_span("INSERT", "bookings"))
        .await?;

        let booking = row_to_booking(&returned_row(rows)?)?;
        info!(booking_id = booking.id, "Booking created");
        Ok(booking)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Booking>> {
        let row = sqlx::query(&format!("SELECT {} FROM bookings WHERE id = ?", BOOKING_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", "bookings"))
            .await?;

        row.as_ref().map(row_to_booking).transpose()
    }

    #[instrument(skip(self))]
    async fn find_all(&self, filters: BookingFilters) -> RepositoryResult<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM bookings \
             WHERE (?1 IS NULL OR user_id = ?1) \
               AND (?2 IS NULL OR restaurant_id = ?2) \
               AND (?3 IS NULL OR status = ?3) \
             ORDER BY booking_time DESC, id DESC",
            BOOKING_COLUMNS
        ))
        .bind(filters.user_id)
        .bind(filters.restaurant_id)
        .bind(filters.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .instrument(db_span("SELECT", "bookings"))
        .await?;

        rows.iter().map(row_to_booking).collect()
    }

    #[instrument(skip(self))]
    async fn update_status(
        &self,
        id: i64,
        expected: BookingStatus,
        next: BookingStatus,
        table_id: Option<i64>,
    ) -> RepositoryResult<StatusUpdate<Booking>> {
        // booking_time never changes, so the window can be read ahead of the write
        let window = match table_id {
            Some(_) => {
                let booking_time: Option<DateTime<Utc>> =
                    sqlx::query_scalar("SELECT booking_time FROM bookings WHERE id = ?")
                        .bind(id)
                        .fetch_optional(&self.pool)
                        .instrument(db_span("SELECT", "bookings"))
                        .await?;
                match booking_time {
                    Some(booking_time) => Some(conflict_window(booking_time)),
                    None => return Ok(StatusUpdate::Stale),
                }
            }
            None => None,
        };

        // Status guard and table clash check are part of the same write
        let rows = sqlx::query(&format!(
            "UPDATE bookings SET status = ?1, table_id = COALESCE(?2, table_id), updated_at = ?3 \
             WHERE id = ?4 AND status = ?5 \
               AND NOT EXISTS (SELECT 1 FROM bookings other \
                   WHERE ?2 IS NOT NULL AND other.table_id = ?2 AND other.id != ?4 \
                     AND other.status = 'confirmed' \
                     AND other.booking_time > ?6 AND other.booking_time < ?7) \
             RETURNING {}",
            BOOKING_COLUMNS
        ))
        .bind(next.as_str())
        .bind(table_id)
        .bind(Utc::now())
        .bind(id)
        .bind(expected.as_str())
        .bind(window.map(|(start, _)| start))
        .bind(window.map(|(_, end)| end))
        .fetch_all(&self.pool)
        .instrument(db_span("UPDATE", "bookings"))
        .await?;

        if let Some(row) = rows.first() {
            let booking = row_to_booking(row)?;
            info!(booking_id = id, from = %expected, to = %next, "Booking status updated");
            return Ok(StatusUpdate::Updated(booking));
        }

        match self.find_by_id(id).await? {
            Some(current) if current.status == expected && table_id.is_some() => {
                warn!(?table_id, "Table already holds a confirmed booking in this slot");
                Ok(StatusUpdate::Conflict)
            }
            _ => Ok(StatusUpdate::Stale),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::slots_overlap;

    #[test]
    fn test_conflict_window_matches_slot_overlap() {
        let start = Utc::now();
        let (low, high) = conflict_window(start);

        assert!(!slots_overlap(start, low));
        assert!(!slots_overlap(start, high));
        assert!(slots_overlap(start, low + Duration::minutes(1)));
        assert!(slots_overlap(start, high - Duration::minutes(1)));
    }
}
