//! Scheduled upload repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use crate::{
    db::store::ScheduledUploadStore,
    error::{AppError, AppResult},
    models::{FileDescriptor, NewScheduledUpload, ScheduledUpload, UploadClaim, UploadStatus},
};

use super::PgStore;

#[derive(Debug, FromRow)]
struct ScheduledUploadRow {
    id: Uuid,
    asset_id: Uuid,
    user_id: Uuid,
    files: Json<Vec<FileDescriptor>>,
    change_notes: String,
    scheduled_for: DateTime<Utc>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    error_message: Option<String>,
    claimed_by: Option<String>,
    lease_expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<ScheduledUploadRow> for ScheduledUpload {
    type Error = AppError;

    fn try_from(row: ScheduledUploadRow) -> Result<Self, Self::Error> {
        let status = UploadStatus::from_str(&row.status)
            .ok_or_else(|| AppError::Database(format!("Unknown upload status: {}", row.status)))?;

        Ok(ScheduledUpload {
            id: row.id,
            asset_id: row.asset_id,
            user_id: row.user_id,
            files: row.files.0,
            change_notes: row.change_notes,
            scheduled_for: row.scheduled_for,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            error_message: row.error_message,
            claimed_by: row.claimed_by,
            lease_expires_at: row.lease_expires_at,
        })
    }
}

fn into_uploads(rows: Vec<ScheduledUploadRow>) -> AppResult<Vec<ScheduledUpload>> {
    rows.into_iter().map(ScheduledUpload::try_from).collect()
}

#[async_trait]
impl ScheduledUploadStore for PgStore {
    async fn insert_upload(&self, upload: NewScheduledUpload) -> AppResult<ScheduledUpload> {
        let row = sqlx::query_as::<_, ScheduledUploadRow>(
            r#"
            INSERT INTO scheduled_uploads (
                id, asset_id, user_id, files, change_notes,
                scheduled_for, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'scheduled', $7, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(upload.asset_id)
        .bind(upload.user_id)
        .bind(Json(&upload.files))
        .bind(&upload.change_notes)
        .bind(upload.scheduled_for)
        .bind(upload.created_at)
        .fetch_one(self.pool())
        .await?;

        row.try_into()
    }

    async fn find_upload(&self, id: Uuid) -> AppResult<Option<ScheduledUpload>> {
        let row = sqlx::query_as::<_, ScheduledUploadRow>(
            r#"SELECT * FROM scheduled_uploads WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(ScheduledUpload::try_from).transpose()
    }

    async fn list_uploads_for_user(&self, user_id: Uuid) -> AppResult<Vec<ScheduledUpload>> {
        let rows = sqlx::query_as::<_, ScheduledUploadRow>(
            r#"
            SELECT * FROM scheduled_uploads
            WHERE user_id = $1
            ORDER BY scheduled_for DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        into_uploads(rows)
    }

    async fn list_uploads_by_status(&self, status: UploadStatus) -> AppResult<Vec<ScheduledUpload>> {
        let rows = sqlx::query_as::<_, ScheduledUploadRow>(
            r#"SELECT * FROM scheduled_uploads WHERE status = $1"#,
        )
        .bind(status.as_str())
        .fetch_all(self.pool())
        .await?;

        into_uploads(rows)
    }

    async fn transition_upload(
        &self,
        id: Uuid,
        from: UploadStatus,
        to: UploadStatus,
        error_message: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<ScheduledUpload>> {
        let row = sqlx::query_as::<_, ScheduledUploadRow>(
            r#"
            UPDATE scheduled_uploads
            SET status = $3,
                error_message = $4,
                updated_at = $5,
                lease_expires_at = CASE WHEN $6 THEN NULL ELSE lease_expires_at END
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(&error_message)
        .bind(now)
        .bind(to.is_terminal())
        .fetch_optional(self.pool())
        .await?;

        row.map(ScheduledUpload::try_from).transpose()
    }

    async fn finish_claimed_upload(
        &self,
        id: Uuid,
        worker_id: &str,
        to: UploadStatus,
        error_message: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<ScheduledUpload>> {
        let row = sqlx::query_as::<_, ScheduledUploadRow>(
            r#"
            UPDATE scheduled_uploads
            SET status = $3,
                error_message = $4,
                updated_at = $5,
                lease_expires_at = NULL
            WHERE id = $1 AND status = 'processing' AND claimed_by = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(worker_id)
        .bind(to.as_str())
        .bind(&error_message)
        .bind(now)
        .fetch_optional(self.pool())
        .await?;

        row.map(ScheduledUpload::try_from).transpose()
    }

    async fn claim_upload(
        &self,
        id: Uuid,
        claim: UploadClaim,
        now: DateTime<Utc>,
    ) -> AppResult<Option<ScheduledUpload>> {
        let row = sqlx::query_as::<_, ScheduledUploadRow>(
            r#"
            UPDATE scheduled_uploads
            SET status = 'processing',
                claimed_by = $2,
                lease_expires_at = $3,
                updated_at = $4
            WHERE id = $1
              AND (
                (status = 'scheduled' AND scheduled_for <= $4)
                OR (status = 'processing' AND (lease_expires_at IS NULL OR lease_expires_at <= $4))
              )
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&claim.worker_id)
        .bind(claim.lease_expires_at)
        .bind(now)
        .fetch_optional(self.pool())
        .await?;

        row.map(ScheduledUpload::try_from).transpose()
    }

    async fn delete_upload(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(r#"DELETE FROM scheduled_uploads WHERE id = $1"#)
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
