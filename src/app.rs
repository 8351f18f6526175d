use axum::{
    extract::FromRef,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::timeout::TimeoutLayer;

use crate::auth::JwtService;
use crate::config::ServerConfig;
use crate::handlers::{
    admin, auth, bookings, cors_middleware, events, health_check, menu, metrics_handler, orders,
    request_validation_middleware, restaurants, reviews, security_headers_middleware, users,
    RequestLimits,
};
use crate::observability::{
    observability_middleware, BusinessTracingMiddleware, DatabaseTracingMiddleware, Metrics,
};
use crate::repositories::{
    Database, SqliteAnalyticsRepository, SqliteBookingRepository, SqliteEventRepository,
    SqliteMenuRepository, SqliteOrderRepository, SqliteRestaurantRepository,
    SqliteReviewRepository, SqliteUserRepository,
};
use crate::services::{
    AnalyticsService, AuthService, BookingService, EventService, MenuService, OrderService,
    RestaurantService, ReviewService, UserService,
};

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub restaurant_service: Arc<RestaurantService>,
    pub menu_service: Arc<MenuService>,
    pub booking_service: Arc<BookingService>,
    pub order_service: Arc<OrderService>,
    pub review_service: Arc<ReviewService>,
    pub event_service: Arc<EventService>,
    pub analytics_service: Arc<AnalyticsService>,
    pub jwt: Arc<JwtService>,
    pub metrics: Arc<Metrics>,
    pub database: Database,
}

impl AppState {
    /// Wire the SQLite repositories and services over one database
    pub fn new(database: Database, jwt: Arc<JwtService>, metrics: Arc<Metrics>) -> Self {
        let pool = database.pool().clone();

        let users = Arc::new(SqliteUserRepository::new(pool.clone()));
        let restaurants = Arc::new(SqliteRestaurantRepository::new(pool.clone()));
        let menu = Arc::new(SqliteMenuRepository::new(pool.clone()));
        let bookings = Arc::new(SqliteBookingRepository::new(pool.clone()));
        let orders = Arc::new(SqliteOrderRepository::new(pool.clone()));
        let reviews = Arc::new(SqliteReviewRepository::new(pool.clone()));
        let events = Arc::new(SqliteEventRepository::new(pool.clone()));
        let analytics = Arc::new(SqliteAnalyticsRepository::new(pool));

        Self {
            auth_service: Arc::new(AuthService::new(users.clone(), jwt.clone())),
            user_service: Arc::new(UserService::new(users)),
            restaurant_service: Arc::new(RestaurantService::new(restaurants.clone())),
            menu_service: Arc::new(MenuService::new(menu.clone(), restaurants.clone())),
            booking_service: Arc::new(BookingService::new(
                bookings,
                restaurants.clone(),
                BusinessTracingMiddleware::new(metrics.clone()),
            )),
            order_service: Arc::new(OrderService::new(
                orders,
                menu,
                restaurants.clone(),
                BusinessTracingMiddleware::new(metrics.clone()),
            )),
            review_service: Arc::new(ReviewService::new(
                reviews,
                restaurants.clone(),
                BusinessTracingMiddleware::new(metrics.clone()),
            )),
            event_service: Arc::new(EventService::new(events, restaurants.clone())),
            analytics_service: Arc::new(AnalyticsService::new(
                analytics,
                restaurants,
                DatabaseTracingMiddleware::new(metrics.clone()),
            )),
            jwt,
            metrics,
            database,
        }
    }
}

impl FromRef<AppState> for Arc<JwtService> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(state: &AppState) -> Self {
        state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<Metrics> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

/// Build the application router
pub fn create_app(state: AppState, server: &ServerConfig) -> Router {
    let metrics_for_middleware = state.metrics.clone();
    let limits = RequestLimits {
        max_request_size: server.max_request_size,
    };

    Router::new()
        // Health and metrics endpoints
        .route("/health/status", get(health_check))
        .route("/metrics", get(metrics_handler))
        // Accounts
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/users", get(users::list_users))
        .route("/api/users/me", put(users::update_me))
        .route("/api/users/:id", delete(users::delete_user))
        .route("/api/users/:id/role", put(users::set_role))
        // Restaurants and tables
        .route(
            "/api/restaurants",
            get(restaurants::list_restaurants).post(restaurants::create_restaurant),
        )
        .route(
            "/api/restaurants/:id",
            get(restaurants::get_restaurant)
                .put(restaurants::update_restaurant)
                .delete(restaurants::delete_restaurant),
        )
        .route(
            "/api/restaurants/:id/tables",
            get(restaurants::list_tables).post(restaurants::create_table),
        )
        .route("/api/tables/:id/status", put(restaurants::update_table_status))
        .route("/api/tables/:id", delete(restaurants::delete_table))
        // Menu
        .route("/api/restaurants/:id/menu", get(menu::get_menu))
        .route("/api/menu-categories", post(menu::create_category))
        .route(
            "/api/menu-items",
            get(menu::list_items).post(menu::create_item),
        )
        .route(
            "/api/menu-items/:id",
            get(menu::get_item)
                .put(menu::update_item)
                .delete(menu::delete_item),
        )
        // Bookings
        .route(
            "/api/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/api/bookings/:id", get(bookings::get_booking))
        .route("/api/bookings/:id/status", put(bookings::update_booking_status))
        // Orders
        .route(
            "/api/orders",
            get(orders::list_orders).post(orders::create_order),
        )
        .route("/api/orders/:id", get(orders::get_order))
        .route("/api/orders/:id/status", put(orders::update_order_status))
        // Reviews
        .route(
            "/api/restaurants/:id/reviews",
            get(reviews::list_restaurant_reviews).post(reviews::create_review),
        )
        .route("/api/reviews", get(reviews::list_reviews))
        .route("/api/reviews/:id/moderate", put(reviews::moderate_review))
        .route("/api/reviews/:id", delete(reviews::delete_review))
        // Events
        .route(
            "/api/events",
            get(events::list_events).post(events::create_event),
        )
        .route(
            "/api/events/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route(
            "/api/events/:id/register",
            post(events::register).delete(events::unregister),
        )
        .route(
            "/api/events/:id/registrations",
            get(events::list_registrations),
        )
        // Back office
        .route("/api/admin/seed", post(admin::seed_database))
        .route("/api/admin/analytics", get(admin::analytics_summary))
        .with_state(state)
        // Add middleware layers (order matters - outer to inner)
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(cors_middleware))
        .layer(middleware::from_fn_with_state(
            limits,
            request_validation_middleware,
        ))
        .layer(middleware::from_fn(move |req, next| {
            observability_middleware(metrics_for_middleware.clone(), req, next)
        }))
}
