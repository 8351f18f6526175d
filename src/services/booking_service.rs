use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::restaurant_service::active_restaurant;
use crate::models::{
    Booking, BookingFilters, BookingStatus, CreateBookingRequest, CurrentUser, ServiceError,
    ServiceResult, TableStatus, Validate,
};
use crate::observability::{BusinessDomain, BusinessTracingMiddleware};
use crate::repositories::{BookingRepository, RestaurantRepository, StatusUpdate};

/// Table reservations and their lifecycle
pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
    restaurants: Arc<dyn RestaurantRepository>,
    tracing: BusinessTracingMiddleware,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        restaurants: Arc<dyn RestaurantRepository>,
        tracing: BusinessTracingMiddleware,
    ) -> Self {
        Self {
            bookings,
            restaurants,
            tracing,
        }
    }

    #[instrument(skip(self, request), fields(user_id = current.id, restaurant_id = request.restaurant_id))]
    pub async fn create_booking(
        &self,
        current: &CurrentUser,
        request: CreateBookingRequest,
    ) -> ServiceResult<Booking> {
        self.tracing
            .trace(
                BusinessDomain::Booking,
                "create",
                self.insert_booking(current, request),
            )
            .await
    }

    /// Plain users only ever see their own bookings
    #[instrument(skip(self), fields(user_id = current.id))]
    pub async fn list_bookings(
        &self,
        current: &CurrentUser,
        mut filters: BookingFilters,
    ) -> ServiceResult<Vec<Booking>> {
        if !current.is_staff_or_admin() {
            filters.user_id = Some(current.id);
        }

        let bookings = self.bookings.find_all(filters).await?;
        info!(count = bookings.len(), "Listed bookings");
        Ok(bookings)
    }

    #[instrument(skip(self), fields(user_id = current.id))]
    pub async fn get_booking(&self, current: &CurrentUser, id: i64) -> ServiceResult<Booking> {
        let booking = self.find(id).await?;

        if !booking.can_be_viewed_by(current) {
            return Err(ServiceError::forbidden("Not allowed to view this booking"));
        }
        Ok(booking)
    }

    /// Move a booking along its lifecycle, optionally assigning a table on confirmation
    #[instrument(skip(self), fields(user_id = current.id))]
    pub async fn update_status(
        &self,
        current: &CurrentUser,
        id: i64,
        next: BookingStatus,
        table_id: Option<i64>,
    ) -> ServiceResult<Booking> {
        self.tracing
            .trace(
                BusinessDomain::Booking,
                "update_status",
                self.transition(current, id, next, table_id),
            )
            .await
    }

    async fn insert_booking(
        &self,
        current: &CurrentUser,
        request: CreateBookingRequest,
    ) -> ServiceResult<Booking> {
        request.validate()?;

        if request.booking_time <= Utc::now() {
            return Err(ServiceError::ValidationError {
                message: "Booking time must be in the future".to_string(),
            });
        }

        active_restaurant(self.restaurants.as_ref(), request.restaurant_id).await?;

        let booking = self.bookings.create(current.id, request).await?;
        crate::info_with_trace!(
            booking_id = booking.id,
            guests = booking.guests,
            booking_time = %booking.booking_time,
            "Booking created"
        );
        Ok(booking)
    }

    async fn transition(
        &self,
        current: &CurrentUser,
        id: i64,
        next: BookingStatus,
        table_id: Option<i64>,
    ) -> ServiceResult<Booking> {
        let booking = self.find(id).await?;
        booking.check_transition(current, next)?;

        if let Some(table_id) = table_id {
            if next != BookingStatus::Confirmed {
                return Err(ServiceError::ValidationError {
                    message: "A table can only be assigned when confirming".to_string(),
                });
            }
            self.check_table(&booking, table_id).await?;
        }

        match self
            .bookings
            .update_status(id, booking.status, next, table_id)
            .await?
        {
            StatusUpdate::Updated(updated) => {
                crate::info_with_trace!(
                    booking_id = id,
                    from = %booking.status,
                    to = %next,
                    table_id = ?updated.table_id,
                    "Booking status updated"
                );
                Ok(updated)
            }
            StatusUpdate::Stale => {
                warn!(booking_id = id, "Booking changed while updating status");
                Err(ServiceError::conflict(format!(
                    "Booking {} was modified concurrently",
                    id
                )))
            }
            StatusUpdate::Conflict => Err(ServiceError::conflict(
                "Table is already booked in this slot",
            )),
        }
    }

    async fn find(&self, id: i64) -> ServiceResult<Booking> {
        self.bookings
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Booking", id))
    }

    async fn check_table(&self, booking: &Booking, table_id: i64) -> ServiceResult<()> {
        let table = self
            .restaurants
            .find_table(table_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Table", table_id))?;

        if table.restaurant_id != booking.restaurant_id {
            return Err(ServiceError::ValidationError {
                message: format!(
                    "Table {} does not belong to restaurant {}",
                    table_id, booking.restaurant_id
                ),
            });
        }
        if table.seats < booking.guests {
            return Err(ServiceError::ValidationError {
                message: format!(
                    "Table {} seats {} guests, booking is for {}",
                    table_id, table.seats, booking.guests
                ),
            });
        }
        if table.status == TableStatus::OutOfService {
            return Err(ServiceError::conflict(format!(
                "Table {} is out of service",
                table_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiningTable, RepositoryError, Role};
    use crate::observability::Metrics;
    use crate::services::restaurant_service::tests::{restaurant, MockTestRestaurantRepository};
    use async_trait::async_trait;
    use chrono::Duration;
    use mockall::{mock, predicate::*};

    mock! {
        TestBookingRepository {}

        #[async_trait]
        impl BookingRepository for TestBookingRepository {
            async fn create(&self, user_id: i64, request: CreateBookingRequest) -> Result<Booking, RepositoryError>;
            async fn find_by_id(&self, id: i64) -> Result<Option<Booking>, RepositoryError>;
            async fn find_all(&self, filters: BookingFilters) -> Result<Vec<Booking>, RepositoryError>;
            async fn update_status(
                &self,
                id: i64,
                expected: BookingStatus,
                next: BookingStatus,
                table_id: Option<i64>,
            ) -> Result<StatusUpdate<Booking>, RepositoryError>;
        }
    }

    fn tracing() -> BusinessTracingMiddleware {
        BusinessTracingMiddleware::new(Arc::new(Metrics::new().unwrap()))
    }

    fn actor(id: i64, role: Role) -> CurrentUser {
        CurrentUser {
            id,
            email: format!("{}@example.com", id),
            role,
        }
    }

    fn booking(id: i64, status: BookingStatus) -> Booking {
        let now = Utc::now();
        Booking {
            id,
            user_id: 10,
            restaurant_id: 1,
            table_id: None,
            booking_time: now + Duration::days(2),
            guests: 4,
            contact_name: "Ada".to_string(),
            contact_phone: "+15550100".to_string(),
            notes: None,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    fn request(hours_ahead: i64) -> CreateBookingRequest {
        CreateBookingRequest {
            restaurant_id: 1,
            booking_time: Utc::now() + Duration::hours(hours_ahead),
            guests: 2,
            contact_name: "Ada".to_string(),
            contact_phone: "+15550100".to_string(),
            notes: None,
        }
    }

    fn table(id: i64, restaurant_id: i64, seats: u32) -> DiningTable {
        DiningTable {
            id,
            restaurant_id,
            number: id,
            seats,
            status: TableStatus::Available,
        }
    }

    #[tokio::test]
    async fn test_create_booking() {
        let mut bookings = MockTestBookingRepository::new();
        bookings
            .expect_create()
            .with(eq(10), always())
            .times(1)
            .returning(|_, _| Ok(booking(1, BookingStatus::Pending)));
        let mut restaurants = MockTestRestaurantRepository::new();
        restaurants
            .expect_find_by_id()
            .returning(|id| Ok(Some(restaurant(id, true))));

        let service = BookingService::new(Arc::new(bookings), Arc::new(restaurants), tracing());
        let created = service
            .create_booking(&actor(10, Role::User), request(24))
            .await
            .unwrap();

        assert_eq!(created.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn test_create_booking_in_past_fails() {
        let mut bookings = MockTestBookingRepository::new();
        bookings.expect_create().never();
        let restaurants = MockTestRestaurantRepository::new();

        let service = BookingService::new(Arc::new(bookings), Arc::new(restaurants), tracing());
        let result = service
            .create_booking(&actor(10, Role::User), request(-1))
            .await;

        assert!(matches!(result, Err(ServiceError::ValidationError { .. })));
    }

    #[tokio::test]
    async fn test_create_booking_at_inactive_restaurant() {
        let bookings = MockTestBookingRepository::new();
        let mut restaurants = MockTestRestaurantRepository::new();
        restaurants
            .expect_find_by_id()
            .returning(|id| Ok(Some(restaurant(id, false))));

        let service = BookingService::new(Arc::new(bookings), Arc::new(restaurants), tracing());
        let result = service
            .create_booking(&actor(10, Role::User), request(24))
            .await;

        assert!(matches!(result, Err(ServiceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_users_only_list_their_own() {
        let mut bookings = MockTestBookingRepository::new();
        bookings
            .expect_find_all()
            .withf(|f| f.user_id == Some(10))
            .returning(|_| Ok(vec![]));

        let service = BookingService::new(
            Arc::new(bookings),
            Arc::new(MockTestRestaurantRepository::new()),
            tracing(),
        );
        let filters = BookingFilters {
            user_id: Some(99),
            ..Default::default()
        };
        service
            .list_bookings(&actor(10, Role::User), filters)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_other_user_cannot_view_booking() {
        let mut bookings = MockTestBookingRepository::new();
        bookings
            .expect_find_by_id()
            .returning(|id| Ok(Some(booking(id, BookingStatus::Pending))));

        let service = BookingService::new(
            Arc::new(bookings),
            Arc::new(MockTestRestaurantRepository::new()),
            tracing(),
        );
        let result = service.get_booking(&actor(11, Role::User), 1).await;

        assert!(matches!(result, Err(ServiceError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_confirm_with_table() {
        let mut bookings = MockTestBookingRepository::new();
        bookings
            .expect_find_by_id()
            .returning(|id| Ok(Some(booking(id, BookingStatus::Pending))));
        bookings
            .expect_update_status()
            .with(
                eq(1),
                eq(BookingStatus::Pending),
                eq(BookingStatus::Confirmed),
                eq(Some(7)),
            )
            .returning(|id, _, next, table_id| {
                let mut updated = booking(id, next);
                updated.table_id = table_id;
                Ok(StatusUpdate::Updated(updated))
            });
        let mut restaurants = MockTestRestaurantRepository::new();
        restaurants
            .expect_find_table()
            .returning(|id| Ok(Some(table(id, 1, 4))));

        let service = BookingService::new(Arc::new(bookings), Arc::new(restaurants), tracing());
        let updated = service
            .update_status(&actor(2, Role::Staff), 1, BookingStatus::Confirmed, Some(7))
            .await
            .unwrap();

        assert_eq!(updated.status, BookingStatus::Confirmed);
        assert_eq!(updated.table_id, Some(7));
    }

    #[tokio::test]
    async fn test_table_too_small() {
        let mut bookings = MockTestBookingRepository::new();
        bookings
            .expect_find_by_id()
            .returning(|id| Ok(Some(booking(id, BookingStatus::Pending))));
        bookings.expect_update_status().never();
        let mut restaurants = MockTestRestaurantRepository::new();
        restaurants
            .expect_find_table()
            .returning(|id| Ok(Some(table(id, 1, 2))));

        let service = BookingService::new(Arc::new(bookings), Arc::new(restaurants), tracing());
        let result = service
            .update_status(&actor(2, Role::Staff), 1, BookingStatus::Confirmed, Some(7))
            .await;

        assert!(matches!(result, Err(ServiceError::ValidationError { .. })));
    }

    #[tokio::test]
    async fn test_slot_conflict_and_stale_updates() {
        let mut bookings = MockTestBookingRepository::new();
        bookings
            .expect_find_by_id()
            .returning(|id| Ok(Some(booking(id, BookingStatus::Pending))));
        bookings
            .expect_update_status()
            .times(1)
            .returning(|_, _, _, _| Ok(StatusUpdate::Conflict));
        bookings
            .expect_update_status()
            .times(1)
            .returning(|_, _, _, _| Ok(StatusUpdate::Stale));
        let mut restaurants = MockTestRestaurantRepository::new();
        restaurants
            .expect_find_table()
            .returning(|id| Ok(Some(table(id, 1, 6))));

        let service = BookingService::new(Arc::new(bookings), Arc::new(restaurants), tracing());
        let staff = actor(2, Role::Staff);

        let conflict = service
            .update_status(&staff, 1, BookingStatus::Confirmed, Some(7))
            .await;
        assert!(matches!(conflict, Err(ServiceError::Conflict { .. })));

        let stale = service
            .update_status(&staff, 1, BookingStatus::Cancelled, None)
            .await;
        assert!(matches!(stale, Err(ServiceError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_completed_booking_cannot_be_cancelled() {
        let mut bookings = MockTestBookingRepository::new();
        bookings
            .expect_find_by_id()
            .returning(|id| Ok(Some(booking(id, BookingStatus::Completed))));

        let service = BookingService::new(
            Arc::new(bookings),
            Arc::new(MockTestRestaurantRepository::new()),
            tracing(),
        );
        let result = service
            .update_status(&actor(10, Role::User), 1, BookingStatus::Cancelled, None)
            .await;

        assert!(matches!(
            result,
            Err(ServiceError::InvalidBookingTransition { .. })
        ));
    }
}
