//! Moderation handlers for the signed-in user
//!
//! These routes sit behind authentication but not behind the ban guard.

mod handler;
pub mod response;

pub use handler::*;
pub use response::*;

use axum::{middleware, routing::get, Router};

use crate::{middleware::auth_middleware, state::AppState};

/// Moderation routes
pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/warnings", get(handler::list_my_warnings))
        .route("/warnings/active", get(handler::list_my_active_warnings))
        .route("/guard", get(handler::check_guard))
        .route("/ban-notice", get(handler::get_ban_notice))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
