//! Scheduled upload handlers

mod handler;
pub mod request;
pub mod response;

pub use handler::*;
pub use request::*;
pub use response::*;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Scheduled upload routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/scheduled",
            post(handler::schedule_upload).get(handler::list_my_uploads),
        )
        .route(
            "/scheduled/{id}",
            get(handler::get_upload).delete(handler::delete_upload),
        )
        .route("/scheduled/{id}/cancel", post(handler::cancel_upload))
}
