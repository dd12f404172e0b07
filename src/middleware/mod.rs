//! HTTP middleware

pub mod auth;
pub mod ban_guard;
pub mod logging;
pub mod rate_limit;

pub use auth::{auth_middleware, AuthenticatedUser};
pub use ban_guard::ban_guard_middleware;
pub use logging::logging_middleware;
pub use rate_limit::nsfw_rate_limit_middleware;
