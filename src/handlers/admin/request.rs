//! Admin request DTOs

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    constants::MAX_REASON_LENGTH,
    models::{AuditAction, AuditDetails, UploadStatus, WarningType},
};

/// User list filter
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub search: Option<String>,
}

/// Update user role request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRoleRequest {
    #[validate(length(min = 1))]
    pub role: String,
}

/// Ban user request
#[derive(Debug, Deserialize, Validate)]
pub struct BanUserRequest {
    #[validate(length(max = MAX_REASON_LENGTH))]
    pub reason: String,
}

/// Issue a warning or suspension
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IssueWarningRequest {
    #[serde(rename = "type")]
    pub warning_type: WarningType,

    #[validate(length(max = MAX_REASON_LENGTH))]
    pub reason: String,

    pub details: Option<String>,

    /// Required for suspensions
    pub duration_hours: Option<i64>,
}

/// Audit log filter
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogQuery {
    pub target_user_id: Option<Uuid>,
}

/// Record an administrative action that has no dedicated endpoint
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordActionRequest {
    pub action: AuditAction,
    pub target_user_id: Option<Uuid>,
    pub target_user_name: Option<String>,
    #[validate(length(max = MAX_REASON_LENGTH))]
    pub reason: Option<String>,
    pub details: Option<AuditDetails>,
}

/// Move a scheduled upload to a new status
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUploadStatusRequest {
    pub status: UploadStatus,
    pub error_message: Option<String>,
}

/// NSFW audit page size
#[derive(Debug, Deserialize)]
pub struct NsfwAuditQuery {
    pub limit: Option<usize>,
}
