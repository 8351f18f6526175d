// Authentication - password hashing, tokens and request extractors

pub mod extractor;
pub mod jwt;
pub mod password;

pub use extractor::OptionalUser;
pub use jwt::{Claims, IssuedToken, JwtError, JwtService};
pub use password::{hash_password, verify_password};
