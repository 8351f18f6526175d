// Services module - business logic layer

pub mod analytics_service;
pub mod auth_service;
pub mod booking_service;
pub mod event_service;
pub mod menu_service;
pub mod order_service;
pub mod restaurant_service;
pub mod review_service;
pub mod user_service;

pub use analytics_service::AnalyticsService;
pub use auth_service::AuthService;
pub use booking_service::BookingService;
pub use event_service::EventService;
pub use menu_service::MenuService;
pub use order_service::OrderService;
pub use restaurant_service::RestaurantService;
pub use review_service::ReviewService;
pub use user_service::UserService;
