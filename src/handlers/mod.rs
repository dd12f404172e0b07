//! HTTP Request Handlers
//!
//! This module contains all HTTP request handlers organized by domain.

pub mod admin;
pub mod auth;
pub mod download;
pub mod health;
pub mod moderation;
pub mod nsfw_check;
pub mod uploads;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::{
    constants::NSFW_MAX_IMAGE_BYTES,
    middleware::{auth_middleware, ban_guard_middleware, nsfw_rate_limit_middleware},
    state::AppState,
};

/// Require a session and send banned or suspended users to the ban notice
fn guarded(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    router
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            ban_guard_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Routes mounted under the API base path
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .nest("/auth", auth::routes(state.clone()))
        .nest("/moderation", moderation::routes(state.clone()))
        .nest("/uploads", guarded(uploads::routes(), state))
        .nest("/admin", guarded(admin::routes(), state))
}

/// Download proxy and NSFW pre-check, served outside the versioned API
pub fn edge_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/download", get(download::download))
        .route(
            "/nsfw-check",
            post(nsfw_check::nsfw_check)
                .layer(DefaultBodyLimit::max(NSFW_MAX_IMAGE_BYTES))
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    nsfw_rate_limit_middleware,
                )),
        )
}
