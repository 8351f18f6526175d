// Repositories module - data access layer

pub mod analytics_repository;
pub mod booking_repository;
pub mod database;
pub mod event_repository;
pub mod menu_repository;
pub mod order_repository;
pub mod restaurant_repository;
pub mod review_repository;
pub mod seed;
pub mod user_repository;


pub use analytics_repository::{AnalyticsRepository, SqliteAnalyticsRepository};
pub use booking_repository::{BookingRepository, SqliteBookingRepository};
pub use database::Database;
pub use event_repository::{EventRepository, SqliteEventRepository};
pub use menu_repository::{MenuRepository, SqliteMenuRepository};
pub use order_repository::{OrderRepository, SqliteOrderRepository};
pub use restaurant_repository::{RestaurantRepository, SqliteRestaurantRepository};
pub use review_repository::{ReviewRepository, SqliteReviewRepository};
pub use seed::{seed_if_empty, SeedReport};
pub use user_repository::{SqliteUserRepository, UserRepository};

/// Result of a compare-and-set status update
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate<T> {
    Updated(T),
    /// The row no longer had the expected status (or no longer exists)
    Stale,
    /// The update would double-book a shared resource
    Conflict,
}
