pub mod admin;
pub mod auth;
pub mod bookings;
pub mod error;
pub mod events;
pub mod extract;
pub mod health;
pub mod menu;
pub mod metrics;
pub mod middleware;
pub mod orders;
pub mod restaurants;
pub mod reviews;
pub mod users;

pub use error::{error_response, service_error_to_response, ErrorResponse};
pub use health::*;
pub use metrics::*;
pub use middleware::*;
