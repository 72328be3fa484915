mod auth;
mod error_handler;
mod rate_limit;

pub use auth::{auth_middleware, require_staff};
pub use error_handler::log_errors;
pub use rate_limit::{RateLimiter, rate_limit};
