//! Admin response DTOs

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    models::{AuditLog, User, Warning},
    services::nsfw_service::{NsfwCheckRecord, NsfwStats},
};

/// User list response
#[derive(Debug, Serialize)]
pub struct UsersListResponse {
    pub users: Vec<User>,
    pub total: usize,
}

/// Ban result
#[derive(Debug, Serialize)]
pub struct BanResponse {
    pub message: String,
    pub warning: Warning,
}

/// Unban result
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnbanResponse {
    pub message: String,
    pub deactivated_warnings: u64,
}

/// Warning list for one user
#[derive(Debug, Serialize)]
pub struct UserWarningsResponse {
    pub warnings: Vec<Warning>,
    pub total: usize,
}

/// Audit log listing
#[derive(Debug, Serialize)]
pub struct AuditLogListResponse {
    pub logs: Vec<AuditLog>,
    pub count: usize,
}

/// NSFW statistics
#[derive(Debug, Serialize)]
pub struct NsfwStatsResponse {
    pub stats: NsfwStats,
    pub timestamp: DateTime<Utc>,
}

/// Recent NSFW checks
#[derive(Debug, Serialize)]
pub struct NsfwAuditResponse {
    pub logs: Vec<NsfwCheckRecord>,
    pub count: usize,
    pub timestamp: DateTime<Utc>,
}
