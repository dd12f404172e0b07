//! Audit log repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgExecutor};
use uuid::Uuid;

use crate::{
    db::store::AuditLogStore,
    error::{AppError, AppResult},
    models::{AuditAction, AuditDetails, AuditLog, NewAuditLog},
};

use super::PgStore;

#[derive(Debug, FromRow)]
struct AuditLogRow {
    id: Uuid,
    action: String,
    performed_by: Uuid,
    performed_by_name: String,
    target_user_id: Option<Uuid>,
    target_user_name: Option<String>,
    reason: Option<String>,
    details: Option<Json<AuditDetails>>,
    timestamp: DateTime<Utc>,
}

impl TryFrom<AuditLogRow> for AuditLog {
    type Error = AppError;

    fn try_from(row: AuditLogRow) -> Result<Self, Self::Error> {
        let action = AuditAction::from_str(&row.action)
            .ok_or_else(|| AppError::Database(format!("Unknown audit action: {}", row.action)))?;

        Ok(AuditLog {
            id: row.id,
            action,
            performed_by: row.performed_by,
            performed_by_name: row.performed_by_name,
            target_user_id: row.target_user_id,
            target_user_name: row.target_user_name,
            reason: row.reason,
            details: row.details.map(|d| d.0),
            timestamp: row.timestamp,
        })
    }
}

/// Append an entry on any executor, so multi-table writes can include it
/// in their transaction
pub(crate) async fn insert_audit<'e, E>(executor: E, entry: NewAuditLog) -> AppResult<AuditLog>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, AuditLogRow>(
        r#"
        INSERT INTO audit_logs (
            id, action, performed_by, performed_by_name,
            target_user_id, target_user_name, reason, details, "timestamp"
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(entry.action.as_str())
    .bind(entry.performed_by)
    .bind(&entry.performed_by_name)
    .bind(entry.target_user_id)
    .bind(&entry.target_user_name)
    .bind(&entry.reason)
    .bind(entry.details.map(Json))
    .bind(entry.timestamp)
    .fetch_one(executor)
    .await?;

    row.try_into()
}

#[async_trait]
impl AuditLogStore for PgStore {
    async fn append_audit(&self, entry: NewAuditLog) -> AppResult<AuditLog> {
        insert_audit(self.pool(), entry).await
    }

    async fn list_audit_logs(&self) -> AppResult<Vec<AuditLog>> {
        let rows = sqlx::query_as::<_, AuditLogRow>(
            r#"SELECT * FROM audit_logs ORDER BY "timestamp" DESC"#,
        )
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(AuditLog::try_from).collect()
    }

    async fn list_audit_logs_for_user(&self, target_user_id: Uuid) -> AppResult<Vec<AuditLog>> {
        let rows = sqlx::query_as::<_, AuditLogRow>(
            r#"
            SELECT * FROM audit_logs
            WHERE target_user_id = $1
            ORDER BY "timestamp" DESC
            "#,
        )
        .bind(target_user_id)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(AuditLog::try_from).collect()
    }
}
