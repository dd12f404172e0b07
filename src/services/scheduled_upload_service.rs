//! Scheduled upload service
//!
//! Validation and lifecycle rules for delayed asset publishes. The store only
//! applies compare-and-set transitions; which transitions are legal is
//! decided here.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    constants::{IMMEDIATE_SCHEDULE_OFFSET_MINUTES, MAX_SCHEDULED_FILES},
    db::ScheduledUploadStore,
    error::{AppError, AppResult},
    models::{FileDescriptor, NewScheduledUpload, ScheduledUpload, UploadClaim, UploadStatus},
    utils::time::parse_date_and_time,
};

/// When the publish should happen
#[derive(Debug, Clone, PartialEq)]
pub enum PublishTime {
    /// A short offset from now
    Immediate,
    /// An exact instant
    At(DateTime<Utc>),
    /// A calendar date and a wall-clock time, read as UTC
    DateAndTime { date: String, time: String },
}

impl PublishTime {
    /// Resolve to an instant strictly after `now`
    pub fn resolve(&self, now: DateTime<Utc>) -> AppResult<DateTime<Utc>> {
        let scheduled_for = match self {
            Self::Immediate => now + Duration::minutes(IMMEDIATE_SCHEDULE_OFFSET_MINUTES),
            Self::At(at) => *at,
            Self::DateAndTime { date, time } => {
                if date.trim().is_empty() || time.trim().is_empty() {
                    return Err(AppError::Validation(
                        "Please select both date and time".to_string(),
                    ));
                }
                parse_date_and_time(date, time).ok_or_else(|| {
                    AppError::Validation("Invalid date or time".to_string())
                })?
            }
        };

        if scheduled_for <= now {
            return Err(AppError::Validation(
                "Scheduled time must be in the future".to_string(),
            ));
        }

        Ok(scheduled_for)
    }
}

/// Parameters for a new scheduled upload
#[derive(Debug, Clone)]
pub struct ScheduleUpload {
    pub asset_id: Uuid,
    pub user_id: Uuid,
    pub files: Vec<FileDescriptor>,
    pub change_notes: String,
    pub publish_time: PublishTime,
}

/// Scheduled upload service
pub struct ScheduledUploadService;

impl ScheduledUploadService {
    /// Validate and queue an upload in `scheduled` status
    pub async fn schedule<S: ScheduledUploadStore + ?Sized>(
        store: &S,
        request: ScheduleUpload,
        now: DateTime<Utc>,
    ) -> AppResult<ScheduledUpload> {
        if request.files.is_empty() {
            return Err(AppError::Validation(
                "Please select at least one file".to_string(),
            ));
        }

        if request.files.len() > MAX_SCHEDULED_FILES {
            return Err(AppError::Validation(format!(
                "At most {} files can be scheduled at once",
                MAX_SCHEDULED_FILES
            )));
        }

        if request.files.iter().any(|f| f.name.trim().is_empty()) {
            return Err(AppError::Validation("File name cannot be empty".to_string()));
        }

        let scheduled_for = request.publish_time.resolve(now)?;

        let upload = store
            .insert_upload(NewScheduledUpload {
                asset_id: request.asset_id,
                user_id: request.user_id,
                files: request.files,
                change_notes: request.change_notes,
                scheduled_for,
                created_at: now,
            })
            .await?;

        tracing::info!(
            upload_id = %upload.id,
            asset_id = %upload.asset_id,
            scheduled_for = %upload.scheduled_for,
            "Upload scheduled"
        );

        Ok(upload)
    }

    /// Fetch one upload
    pub async fn get<S: ScheduledUploadStore + ?Sized>(store: &S, id: Uuid) -> AppResult<ScheduledUpload> {
        store
            .find_upload(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Scheduled upload not found".to_string()))
    }

    /// The user's uploads by `scheduled_for` descending; empty on store failure
    pub async fn list_for_user<S: ScheduledUploadStore + ?Sized>(
        store: &S,
        user_id: Uuid,
    ) -> Vec<ScheduledUpload> {
        match store.list_uploads_for_user(user_id).await {
            Ok(uploads) => uploads,
            Err(e) => {
                tracing::error!(error = %e, user_id = %user_id, "Failed to list scheduled uploads");
                Vec::new()
            }
        }
    }

    /// Scheduled uploads whose time has come; empty on store failure
    pub async fn list_pending<S: ScheduledUploadStore + ?Sized>(
        store: &S,
        now: DateTime<Utc>,
    ) -> Vec<ScheduledUpload> {
        match store.list_uploads_by_status(UploadStatus::Scheduled).await {
            Ok(uploads) => uploads.into_iter().filter(|u| u.is_due(now)).collect(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to list pending uploads");
                Vec::new()
            }
        }
    }

    /// Processing uploads whose worker lease ran out; empty on store failure
    pub async fn list_stale_claims<S: ScheduledUploadStore + ?Sized>(
        store: &S,
        now: DateTime<Utc>,
    ) -> Vec<ScheduledUpload> {
        match store.list_uploads_by_status(UploadStatus::Processing).await {
            Ok(uploads) => uploads
                .into_iter()
                .filter(|u| u.has_stale_claim(now))
                .collect(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to list stale upload claims");
                Vec::new()
            }
        }
    }

    /// Move an upload forward in its lifecycle
    ///
    /// Illegal transitions and lost races both yield `Conflict`; the stored
    /// status is left untouched.
    pub async fn update_status<S: ScheduledUploadStore + ?Sized>(
        store: &S,
        id: Uuid,
        status: UploadStatus,
        error_message: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<ScheduledUpload> {
        let current = Self::get(store, id).await?;

        if !current.status.can_transition_to(status) {
            return Err(AppError::Conflict(format!(
                "Cannot move upload from {} to {}",
                current.status, status
            )));
        }

        let updated = store
            .transition_upload(id, current.status, status, error_message, now)
            .await?
            .ok_or_else(|| {
                AppError::Conflict("Scheduled upload was modified concurrently".to_string())
            })?;

        tracing::info!(upload_id = %id, from = %current.status, to = %status, "Upload status updated");

        Ok(updated)
    }

    /// Record the outcome of a claimed upload on behalf of `worker_id`
    ///
    /// Fails with `Conflict` if the claim was taken over by another worker,
    /// so a worker whose lease lapsed cannot overwrite the new holder's job.
    pub async fn finish_claim<S: ScheduledUploadStore + ?Sized>(
        store: &S,
        id: Uuid,
        worker_id: &str,
        status: UploadStatus,
        error_message: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<ScheduledUpload> {
        if !matches!(status, UploadStatus::Completed | UploadStatus::Failed) {
            return Err(AppError::Validation(format!(
                "A claimed upload can only finish as completed or failed, not {}",
                status
            )));
        }

        let updated = store
            .finish_claimed_upload(id, worker_id, status, error_message, now)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!("Worker {} no longer holds the claim", worker_id))
            })?;

        tracing::info!(upload_id = %id, worker_id = %worker_id, to = %status, "Claimed upload finished");

        Ok(updated)
    }

    /// Cancel an upload that has not started
    pub async fn cancel<S: ScheduledUploadStore + ?Sized>(
        store: &S,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<ScheduledUpload> {
        let current = Self::get(store, id).await?;
        if current.status != UploadStatus::Scheduled {
            return Err(AppError::Conflict(format!(
                "Only scheduled uploads can be cancelled (status is {})",
                current.status
            )));
        }

        Self::update_status(store, id, UploadStatus::Cancelled, None, now).await
    }

    /// Remove an upload in any status
    pub async fn delete<S: ScheduledUploadStore + ?Sized>(store: &S, id: Uuid) -> AppResult<()> {
        let current = Self::get(store, id).await?;
        if current.status == UploadStatus::Processing {
            tracing::warn!(upload_id = %id, "Deleting an upload that a worker is processing");
        }

        if !store.delete_upload(id).await? {
            return Err(AppError::NotFound("Scheduled upload not found".to_string()));
        }

        tracing::info!(upload_id = %id, "Scheduled upload deleted");
        Ok(())
    }

    /// Try to take an upload for processing; `None` if another worker has it
    pub async fn claim<S: ScheduledUploadStore + ?Sized>(
        store: &S,
        id: Uuid,
        worker_id: &str,
        lease: Duration,
        now: DateTime<Utc>,
    ) -> AppResult<Option<ScheduledUpload>> {
        store
            .claim_upload(
                id,
                UploadClaim {
                    worker_id: worker_id.to_string(),
                    lease_expires_at: now + lease,
                },
                now,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{store::MockScheduledUploadStore, MemoryStore};

    fn files() -> Vec<FileDescriptor> {
        vec![FileDescriptor {
            name: "model.fbx".to_string(),
            size: 1024,
            content_type: "application/octet-stream".to_string(),
        }]
    }

    fn request(user_id: Uuid, publish_time: PublishTime) -> ScheduleUpload {
        ScheduleUpload {
            asset_id: Uuid::new_v4(),
            user_id,
            files: files(),
            change_notes: "v2".to_string(),
            publish_time,
        }
    }

    #[tokio::test]
    async fn test_schedule_rejects_past_time_without_writing() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let user_id = Uuid::new_v4();

        for at in [now, now - Duration::minutes(5)] {
            let err = ScheduledUploadService::schedule(&store, request(user_id, PublishTime::At(at)), now)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }

        assert!(ScheduledUploadService::list_for_user(&store, user_id).await.is_empty());
    }

    #[tokio::test]
    async fn test_schedule_rejects_missing_files_and_time() {
        let store = MemoryStore::new();
        let now = Utc::now();

        let mut no_files = request(Uuid::new_v4(), PublishTime::Immediate);
        no_files.files.clear();
        let err = ScheduledUploadService::schedule(&store, no_files, now).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("at least one file")));

        let missing_time = request(
            Uuid::new_v4(),
            PublishTime::DateAndTime {
                date: "2030-01-01".to_string(),
                time: String::new(),
            },
        );
        let err = ScheduledUploadService::schedule(&store, missing_time, now).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("both date and time")));
    }

    #[tokio::test]
    async fn test_immediate_schedules_one_minute_out() {
        let store = MemoryStore::new();
        let now = Utc::now();

        let upload = ScheduledUploadService::schedule(&store, request(Uuid::new_v4(), PublishTime::Immediate), now)
            .await
            .unwrap();
        assert_eq!(upload.status, UploadStatus::Scheduled);
        assert_eq!(upload.scheduled_for, now + Duration::minutes(1));
    }

    #[tokio::test]
    async fn test_list_pending_filters_by_time() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let user_id = Uuid::new_v4();

        let soon = ScheduledUploadService::schedule(
            &store,
            request(user_id, PublishTime::At(now + Duration::minutes(10))),
            now,
        )
        .await
        .unwrap();
        let later = ScheduledUploadService::schedule(
            &store,
            request(user_id, PublishTime::At(now + Duration::hours(3))),
            now,
        )
        .await
        .unwrap();

        assert!(ScheduledUploadService::list_pending(&store, now).await.is_empty());

        let pending = ScheduledUploadService::list_pending(&store, now + Duration::hours(1)).await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, soon.id);

        let listed = ScheduledUploadService::list_for_user(&store, user_id).await;
        assert_eq!(listed[0].id, later.id);
        assert_eq!(listed[1].id, soon.id);
    }

    #[tokio::test]
    async fn test_cancel_completed_conflicts_and_keeps_status() {
        let store = MemoryStore::new();
        let now = Utc::now();

        let upload = ScheduledUploadService::schedule(&store, request(Uuid::new_v4(), PublishTime::Immediate), now)
            .await
            .unwrap();
        ScheduledUploadService::update_status(&store, upload.id, UploadStatus::Completed, None, now)
            .await
            .unwrap();

        let err = ScheduledUploadService::cancel(&store, upload.id, now).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let stored = ScheduledUploadService::get(&store, upload.id).await.unwrap();
        assert_eq!(stored.status, UploadStatus::Completed);
    }

    #[tokio::test]
    async fn test_update_status_rejects_backward_move() {
        let store = MemoryStore::new();
        let now = Utc::now();

        let upload = ScheduledUploadService::schedule(&store, request(Uuid::new_v4(), PublishTime::Immediate), now)
            .await
            .unwrap();
        ScheduledUploadService::update_status(&store, upload.id, UploadStatus::Processing, None, now)
            .await
            .unwrap();

        let err = ScheduledUploadService::update_status(&store, upload.id, UploadStatus::Scheduled, None, now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_any_status() {
        let store = MemoryStore::new();
        let now = Utc::now();

        let upload = ScheduledUploadService::schedule(&store, request(Uuid::new_v4(), PublishTime::Immediate), now)
            .await
            .unwrap();
        ScheduledUploadService::update_status(&store, upload.id, UploadStatus::Processing, None, now)
            .await
            .unwrap();

        ScheduledUploadService::delete(&store, upload.id).await.unwrap();
        let err = ScheduledUploadService::get(&store, upload.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_pending_swallows_store_errors() {
        let mut store = MockScheduledUploadStore::new();
        store
            .expect_list_uploads_by_status()
            .returning(|_| Err(AppError::Database("connection reset".to_string())));

        assert!(ScheduledUploadService::list_pending(&store, Utc::now()).await.is_empty());
    }

    #[tokio::test]
    async fn test_lost_race_is_conflict() {
        let now = Utc::now();
        let upload = NewScheduledUpload {
            asset_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            files: files(),
            change_notes: String::new(),
            scheduled_for: now,
            created_at: now,
        }
        .into_upload();
        let id = upload.id;

        let mut store = MockScheduledUploadStore::new();
        store
            .expect_find_upload()
            .returning(move |_| Ok(Some(upload.clone())));
        store
            .expect_transition_upload()
            .returning(|_, _, _, _, _| Ok(None));

        let err = ScheduledUploadService::update_status(&store, id, UploadStatus::Processing, None, now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_stale_worker_cannot_finish_taken_over_claim() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let upload = store
            .insert_upload(NewScheduledUpload {
                asset_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                files: files(),
                change_notes: String::new(),
                scheduled_for: now,
                created_at: now,
            })
            .await
            .unwrap();

        let lease = Duration::minutes(5);
        ScheduledUploadService::claim(&store, upload.id, "worker-a", lease, now)
            .await
            .unwrap()
            .unwrap();
        let later = now + Duration::minutes(6);
        ScheduledUploadService::claim(&store, upload.id, "worker-b", lease, later)
            .await
            .unwrap()
            .unwrap();

        let err = ScheduledUploadService::finish_claim(
            &store,
            upload.id,
            "worker-a",
            UploadStatus::Failed,
            Some("timed out".to_string()),
            later,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let stored = ScheduledUploadService::get(&store, upload.id).await.unwrap();
        assert_eq!(stored.status, UploadStatus::Processing);
        assert_eq!(stored.claimed_by.as_deref(), Some("worker-b"));
        assert!(stored.error_message.is_none());

        let finished = ScheduledUploadService::finish_claim(
            &store,
            upload.id,
            "worker-b",
            UploadStatus::Completed,
            None,
            later + Duration::minutes(1),
        )
        .await
        .unwrap();
        assert_eq!(finished.status, UploadStatus::Completed);
        assert!(finished.lease_expires_at.is_none());
    }

    #[tokio::test]
    async fn test_finish_claim_rejects_non_outcome_status() {
        let store = MockScheduledUploadStore::new();

        let err = ScheduledUploadService::finish_claim(
            &store,
            Uuid::new_v4(),
            "worker-a",
            UploadStatus::Cancelled,
            None,
            Utc::now(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
