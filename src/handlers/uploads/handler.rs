//! Scheduled upload handler implementations

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    middleware::auth::AuthenticatedUser,
    models::ScheduledUpload,
    services::{
        scheduled_upload_service::ScheduleUpload, ModerationService, ScheduledUploadService,
    },
    state::AppState,
};

use super::{
    request::ScheduleUploadRequest,
    response::{ScheduledUploadListResponse, ScheduledUploadResponse},
};

/// Load an upload the caller owns, or any upload for a moderator
async fn load_accessible(
    state: &AppState,
    auth_user: &AuthenticatedUser,
    id: Uuid,
) -> AppResult<ScheduledUpload> {
    let upload = ScheduledUploadService::get(state.store(), id).await?;

    if upload.user_id != auth_user.id {
        ModerationService::require_moderator(state.store(), auth_user.id)
            .await
            .map_err(|_| AppError::Forbidden("You do not have access to this upload".to_string()))?;
    }

    Ok(upload)
}

/// Schedule a publish
pub async fn schedule_upload(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(payload): Json<ScheduleUploadRequest>,
) -> AppResult<(StatusCode, Json<ScheduledUploadResponse>)> {
    payload.validate()?;

    let now = state.clock().now();
    let request = ScheduleUpload {
        asset_id: payload.asset_id,
        user_id: auth_user.id,
        publish_time: payload.publish_time(),
        files: payload.files,
        change_notes: payload.change_notes,
    };

    let upload = ScheduledUploadService::schedule(state.store(), request, now).await?;

    Ok((StatusCode::CREATED, Json(ScheduledUploadResponse::new(upload, now))))
}

/// The caller's scheduled uploads, latest publish time first
pub async fn list_my_uploads(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> Json<ScheduledUploadListResponse> {
    let uploads = ScheduledUploadService::list_for_user(state.store(), auth_user.id).await;

    Json(ScheduledUploadListResponse::new(uploads, state.clock().now()))
}

/// Get one scheduled upload
pub async fn get_upload(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ScheduledUploadResponse>> {
    let upload = load_accessible(&state, &auth_user, id).await?;

    Ok(Json(ScheduledUploadResponse::new(upload, state.clock().now())))
}

/// Cancel an upload that has not started
pub async fn cancel_upload(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ScheduledUploadResponse>> {
    load_accessible(&state, &auth_user, id).await?;

    let now = state.clock().now();
    let upload = ScheduledUploadService::cancel(state.store(), id, now).await?;

    Ok(Json(ScheduledUploadResponse::new(upload, now)))
}

/// Delete an upload in any status
pub async fn delete_upload(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    load_accessible(&state, &auth_user, id).await?;

    ScheduledUploadService::delete(state.store(), id).await?;

    Ok(StatusCode::NO_CONTENT)
}
