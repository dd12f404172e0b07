//! Admin handler implementations
//!
//! Every handler re-reads the caller from the store and requires a
//! moderator role before doing anything else.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    constants::{NSFW_AUDIT_DEFAULT_LIMIT, NSFW_CHECK_LOG_CAPACITY},
    db::UserStore,
    error::{AppError, AppResult},
    handlers::uploads::response::{ScheduledUploadListResponse, ScheduledUploadResponse},
    middleware::auth::AuthenticatedUser,
    models::{AuditAction, AuditLog, User, Warning},
    services::{
        audit_service::ActionRecord, moderation_service::IssueWarning, AuditService,
        ModerationService, ScheduledUploadService,
    },
    state::AppState,
};

use super::{
    request::{
        AuditLogQuery, BanUserRequest, IssueWarningRequest, ListUsersQuery, NsfwAuditQuery,
        RecordActionRequest, UpdateUploadStatusRequest, UpdateUserRoleRequest,
    },
    response::{
        AuditLogListResponse, BanResponse, NsfwAuditResponse, NsfwStatsResponse, UnbanResponse,
        UserWarningsResponse, UsersListResponse,
    },
};

async fn require_admin(state: &AppState, auth_user: &AuthenticatedUser) -> AppResult<User> {
    ModerationService::require_moderator(state.store(), auth_user.id).await
}

/// List users, optionally filtered by a search term
pub async fn list_users(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Query(query): Query<ListUsersQuery>,
) -> AppResult<Json<UsersListResponse>> {
    require_admin(&state, &auth_user).await?;

    let search = query.search.filter(|s| !s.trim().is_empty());
    let users = state.store().list_users(search).await?;

    Ok(Json(UsersListResponse {
        total: users.len(),
        users,
    }))
}

/// Update a user's role
pub async fn update_user_role(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRoleRequest>,
) -> AppResult<Json<User>> {
    let actor = require_admin(&state, &auth_user).await?;
    payload.validate()?;

    let user = ModerationService::change_role(
        state.store(),
        &actor,
        id,
        &payload.role,
        state.clock().now(),
    )
    .await?;

    Ok(Json(user))
}

/// Ban a user
pub async fn ban_user(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<BanUserRequest>,
) -> AppResult<(StatusCode, Json<BanResponse>)> {
    let actor = require_admin(&state, &auth_user).await?;
    payload.validate()?;

    let warning =
        ModerationService::ban(state.store(), &actor, id, &payload.reason, state.clock().now())
            .await?;

    Ok((
        StatusCode::CREATED,
        Json(BanResponse {
            message: "User banned".to_string(),
            warning,
        }),
    ))
}

/// Lift a user's ban and suspensions
pub async fn unban_user(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UnbanResponse>> {
    let actor = require_admin(&state, &auth_user).await?;

    let deactivated_warnings =
        ModerationService::unban(state.store(), &actor, id, state.clock().now()).await?;

    Ok(Json(UnbanResponse {
        message: "User unbanned".to_string(),
        deactivated_warnings,
    }))
}

/// Issue a warning or suspension
pub async fn issue_warning(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<IssueWarningRequest>,
) -> AppResult<(StatusCode, Json<Warning>)> {
    let actor = require_admin(&state, &auth_user).await?;
    payload.validate()?;

    let warning = ModerationService::issue_warning(
        state.store(),
        &actor,
        id,
        IssueWarning {
            warning_type: payload.warning_type,
            reason: payload.reason,
            details: payload.details,
            duration_hours: payload.duration_hours,
        },
        state.clock().now(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(warning)))
}

/// All moderation records for a user
pub async fn list_user_warnings(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserWarningsResponse>> {
    require_admin(&state, &auth_user).await?;

    let warnings = ModerationService::list_warnings(state.store(), id).await?;

    Ok(Json(UserWarningsResponse {
        total: warnings.len(),
        warnings,
    }))
}

/// Audit log, newest first, optionally for one target user
pub async fn list_audit_logs(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Query(query): Query<AuditLogQuery>,
) -> AppResult<Json<AuditLogListResponse>> {
    require_admin(&state, &auth_user).await?;

    let logs = match query.target_user_id {
        Some(target) => AuditService::list_for_user(state.store(), target).await,
        None => AuditService::list_all(state.store()).await,
    };

    Ok(Json(AuditLogListResponse {
        count: logs.len(),
        logs,
    }))
}

/// Record a ticket action
///
/// Ban, unban and role changes are recorded by their own endpoints.
pub async fn record_action(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(payload): Json<RecordActionRequest>,
) -> AppResult<(StatusCode, Json<AuditLog>)> {
    let actor = require_admin(&state, &auth_user).await?;
    payload.validate()?;

    if !matches!(
        payload.action,
        AuditAction::TicketResolved | AuditAction::TicketAssigned
    ) {
        return Err(AppError::Validation(format!(
            "{} is recorded by its own endpoint",
            payload.action
        )));
    }

    let entry = AuditService::record_action(
        state.store(),
        &actor,
        ActionRecord {
            action: payload.action,
            target_user_id: payload.target_user_id,
            target_user_name: payload.target_user_name,
            reason: payload.reason,
            details: payload.details,
        },
        state.clock().now(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

/// Scheduled uploads whose publish time has passed
pub async fn list_pending_uploads(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> AppResult<Json<ScheduledUploadListResponse>> {
    require_admin(&state, &auth_user).await?;

    let now = state.clock().now();
    let uploads = ScheduledUploadService::list_pending(state.store(), now).await;

    Ok(Json(ScheduledUploadListResponse::new(uploads, now)))
}

/// Move a scheduled upload along its lifecycle
pub async fn update_upload_status(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUploadStatusRequest>,
) -> AppResult<Json<ScheduledUploadResponse>> {
    require_admin(&state, &auth_user).await?;

    let now = state.clock().now();
    let upload = ScheduledUploadService::update_status(
        state.store(),
        id,
        payload.status,
        payload.error_message,
        now,
    )
    .await?;

    Ok(Json(ScheduledUploadResponse::new(upload, now)))
}

/// Aggregate NSFW check statistics
pub async fn get_nsfw_stats(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> AppResult<Json<NsfwStatsResponse>> {
    require_admin(&state, &auth_user).await?;

    Ok(Json(NsfwStatsResponse {
        stats: state.nsfw_log().stats(),
        timestamp: state.clock().now(),
    }))
}

/// Most recent NSFW checks
pub async fn get_nsfw_audit(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Query(query): Query<NsfwAuditQuery>,
) -> AppResult<Json<NsfwAuditResponse>> {
    require_admin(&state, &auth_user).await?;

    let limit = query
        .limit
        .unwrap_or(NSFW_AUDIT_DEFAULT_LIMIT)
        .min(NSFW_CHECK_LOG_CAPACITY);
    let logs = state.nsfw_log().recent(limit);

    Ok(Json(NsfwAuditResponse {
        count: logs.len(),
        logs,
        timestamp: state.clock().now(),
    }))
}
