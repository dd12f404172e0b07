//! Ban guard middleware
//!
//! Runs after authentication on every protected route outside the moderation
//! endpoints, so a banned or suspended session can still read its notice.

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    constants::BAN_NOTICE_PATH,
    error::AppError,
    middleware::auth::AuthenticatedUser,
    services::{GuardOutcome, RouteGuard},
    state::AppState,
};

/// Redirect sessions with an active ban or suspension to the ban notice
pub async fn ban_guard_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|u| u.id)
        .ok_or(AppError::Unauthorized)?;

    match RouteGuard::evaluate(state.store(), user_id).await {
        GuardOutcome::Proceed => Ok(next.run(request).await),
        GuardOutcome::RedirectToBanNotice => {
            tracing::info!(user_id = %user_id, path = %request.uri().path(), "Blocked navigation for restricted account");
            Ok(Redirect::to(BAN_NOTICE_PATH).into_response())
        }
    }
}
