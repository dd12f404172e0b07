//! Scheduled upload model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a scheduled upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Scheduled,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl UploadStatus {
    /// Get status as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse status from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(Self::Scheduled),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Check if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Scheduled => 0,
            Self::Processing => 1,
            Self::Completed | Self::Failed | Self::Cancelled => 2,
        }
    }

    /// Check whether moving to `next` keeps the lifecycle monotonic
    ///
    /// scheduled -> processing -> {completed, failed}, scheduled -> cancelled.
    pub fn can_transition_to(&self, next: UploadStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Cancelled => *self == Self::Scheduled,
            _ => next.rank() > self.rank(),
        }
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// File declared for a scheduled publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub name: String,
    pub size: u64,
    pub content_type: String,
}

/// Scheduled upload record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledUpload {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub user_id: Uuid,
    pub files: Vec<FileDescriptor>,
    pub change_notes: String,
    pub scheduled_for: DateTime<Utc>,
    pub status: UploadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub error_message: Option<String>,
    pub claimed_by: Option<String>,
    pub lease_expires_at: Option<DateTime<Utc>>,
}

impl ScheduledUpload {
    /// Due for processing at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == UploadStatus::Scheduled && self.scheduled_for <= now
    }

    /// Claimed by a worker whose lease ran out
    pub fn has_stale_claim(&self, now: DateTime<Utc>) -> bool {
        self.status == UploadStatus::Processing
            && self.lease_expires_at.is_none_or(|at| at <= now)
    }
}

/// Fields needed to insert a scheduled upload
#[derive(Debug, Clone)]
pub struct NewScheduledUpload {
    pub asset_id: Uuid,
    pub user_id: Uuid,
    pub files: Vec<FileDescriptor>,
    pub change_notes: String,
    pub scheduled_for: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl NewScheduledUpload {
    /// Materialize the record in `scheduled` status
    pub fn into_upload(self) -> ScheduledUpload {
        ScheduledUpload {
            id: Uuid::new_v4(),
            asset_id: self.asset_id,
            user_id: self.user_id,
            files: self.files,
            change_notes: self.change_notes,
            scheduled_for: self.scheduled_for,
            status: UploadStatus::Scheduled,
            created_at: self.created_at,
            updated_at: self.created_at,
            error_message: None,
            claimed_by: None,
            lease_expires_at: None,
        }
    }
}

/// Worker claim written together with the scheduled -> processing transition
#[derive(Debug, Clone)]
pub struct UploadClaim {
    pub worker_id: String,
    pub lease_expires_at: DateTime<Utc>,
}
