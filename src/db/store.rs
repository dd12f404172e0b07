//! Store traits
//!
//! Every persistence concern sits behind one of these traits so handlers and
//! services run unchanged against Postgres or the in-memory backend.
//! Multi-record writes (ban, unban, role change) are single trait calls so
//! each backend can apply them atomically.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        AuditLog, NewAuditLog, NewScheduledUpload, NewUser, NewWarning, ScheduledUpload, UploadClaim,
        UploadStatus, User, Warning,
    },
};

/// User records and the ban fields they carry
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user; duplicate username or email yields `AlreadyExists`
    async fn create_user(&self, user: NewUser) -> AppResult<User>;

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Match on username or email
    async fn find_user_by_identifier(&self, identifier: &str) -> AppResult<Option<User>>;

    /// Newest first, optionally filtered by a case-insensitive substring
    async fn list_users(&self, search: Option<String>) -> AppResult<Vec<User>>;

    /// Update the role and append the audit entry in one write
    async fn change_role(&self, id: Uuid, role: String, audit: NewAuditLog) -> AppResult<User>;
}

/// Warning, suspension and ban records
#[async_trait]
pub trait ModerationStore: Send + Sync {
    async fn insert_warning(&self, warning: NewWarning) -> AppResult<Warning>;

    /// All records for the user, newest first
    async fn list_warnings(&self, user_id: Uuid) -> AppResult<Vec<Warning>>;

    /// Records with `is_active`; expiry is not consulted
    async fn list_active_warnings(&self, user_id: Uuid) -> AppResult<Vec<Warning>>;

    /// Set the user's ban fields, insert the ban record and the audit entry atomically
    async fn apply_ban(&self, ban: NewWarning, audit: NewAuditLog) -> AppResult<Warning>;

    /// Clear the ban fields, deactivate active bans and suspensions, and append
    /// the audit entry atomically. Returns the number of records deactivated.
    async fn lift_ban(&self, user_id: Uuid, audit: NewAuditLog) -> AppResult<u64>;
}

/// Append-only audit log
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditLogStore: Send + Sync {
    async fn append_audit(&self, entry: NewAuditLog) -> AppResult<AuditLog>;

    /// Newest first
    async fn list_audit_logs(&self) -> AppResult<Vec<AuditLog>>;

    /// Entries targeting the user, newest first
    async fn list_audit_logs_for_user(&self, target_user_id: Uuid) -> AppResult<Vec<AuditLog>>;
}

/// Scheduled upload queue
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScheduledUploadStore: Send + Sync {
    async fn insert_upload(&self, upload: NewScheduledUpload) -> AppResult<ScheduledUpload>;

    async fn find_upload(&self, id: Uuid) -> AppResult<Option<ScheduledUpload>>;

    /// Ordered by `scheduled_for` descending
    async fn list_uploads_for_user(&self, user_id: Uuid) -> AppResult<Vec<ScheduledUpload>>;

    /// Store-side status predicate only; time filtering happens in the caller
    async fn list_uploads_by_status(&self, status: UploadStatus) -> AppResult<Vec<ScheduledUpload>>;

    /// Move from `from` to `to` only if the record is still in `from`.
    /// Returns `None` when the record is missing or its status moved on.
    async fn transition_upload(
        &self,
        id: Uuid,
        from: UploadStatus,
        to: UploadStatus,
        error_message: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<ScheduledUpload>>;

    /// Record a worker's outcome for a `processing` record, only while
    /// `worker_id` still holds the claim. `None` if the claim was lost.
    async fn finish_claimed_upload(
        &self,
        id: Uuid,
        worker_id: &str,
        to: UploadStatus,
        error_message: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<ScheduledUpload>>;

    /// Atomically move a due `scheduled` record, or a `processing` record with
    /// an expired lease, to `processing` under the given claim.
    async fn claim_upload(
        &self,
        id: Uuid,
        claim: UploadClaim,
        now: DateTime<Utc>,
    ) -> AppResult<Option<ScheduledUpload>>;

    /// Physical removal; returns whether a record existed
    async fn delete_upload(&self, id: Uuid) -> AppResult<bool>;
}

/// Everything the application state needs from persistence
pub trait Store: UserStore + ModerationStore + AuditLogStore + ScheduledUploadStore {}

impl<T> Store for T where T: UserStore + ModerationStore + AuditLogStore + ScheduledUploadStore {}
