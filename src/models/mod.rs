// Re-export all model types
pub use self::analytics::*;
pub use self::booking::*;
pub use self::enums::*;
pub use self::errors::*;
pub use self::event::*;
pub use self::menu::*;
pub use self::money::*;
pub use self::order::*;
pub use self::restaurant::*;
pub use self::review::*;
pub use self::user::*;
pub use self::validation::*;

mod analytics;
mod booking;
mod enums;
mod errors;
mod event;
mod menu;
mod money;
mod order;
mod restaurant;
mod review;
mod user;
mod validation;
