//! Moderation handler implementations

use axum::{extract::State, Json};

use crate::{
    constants::BAN_NOTICE_PATH,
    error::{AppError, AppResult},
    middleware::auth::AuthenticatedUser,
    services::{BanNotice, GuardOutcome, ModerationService, RouteGuard},
    state::AppState,
};

use super::response::{GuardResponse, WarningListResponse};

/// All of the caller's moderation records, newest first
pub async fn list_my_warnings(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> AppResult<Json<WarningListResponse>> {
    let warnings = ModerationService::list_warnings(state.store(), auth_user.id).await?;

    Ok(Json(WarningListResponse {
        total: warnings.len(),
        warnings,
    }))
}

/// The caller's active records
pub async fn list_my_active_warnings(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> AppResult<Json<WarningListResponse>> {
    let warnings = ModerationService::get_active_warnings(state.store(), auth_user.id).await?;

    Ok(Json(WarningListResponse {
        total: warnings.len(),
        warnings,
    }))
}

/// Evaluate the route guard for the caller
pub async fn check_guard(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> Json<GuardResponse> {
    let outcome = RouteGuard::evaluate(state.store(), auth_user.id).await;

    Json(GuardResponse {
        state: "resolved",
        outcome,
        redirect_to: match outcome {
            GuardOutcome::Proceed => None,
            GuardOutcome::RedirectToBanNotice => Some(BAN_NOTICE_PATH),
        },
    })
}

/// Ban notice for the caller's active ban or suspension
pub async fn get_ban_notice(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> AppResult<Json<BanNotice>> {
    let active = ModerationService::get_active_warnings(state.store(), auth_user.id).await?;

    let warning = BanNotice::select(&active)
        .ok_or_else(|| AppError::NotFound("No active ban or suspension".to_string()))?;

    Ok(Json(BanNotice::from_warning(warning, state.clock().now())))
}
