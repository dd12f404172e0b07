//! Admin moderation handlers

mod handler;
pub mod request;
pub mod response;

pub use handler::*;
pub use request::*;
pub use response::*;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;

/// Admin routes
pub fn routes() -> Router<AppState> {
    Router::new()
        // User moderation
        .route("/users", get(handler::list_users))
        .route("/users/{id}/role", put(handler::update_user_role))
        .route("/users/{id}/ban", post(handler::ban_user))
        .route("/users/{id}/unban", post(handler::unban_user))
        .route(
            "/users/{id}/warnings",
            post(handler::issue_warning).get(handler::list_user_warnings),
        )
        // Audit log
        .route(
            "/audit-logs",
            get(handler::list_audit_logs).post(handler::record_action),
        )
        // Scheduled upload queue
        .route("/scheduled-uploads/pending", get(handler::list_pending_uploads))
        .route(
            "/scheduled-uploads/{id}/status",
            put(handler::update_upload_status),
        )
        // NSFW check views
        .route("/nsfw/stats", get(handler::get_nsfw_stats))
        .route("/nsfw/audit", get(handler::get_nsfw_audit))
}
