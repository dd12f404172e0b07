//! Warning repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use crate::{
    db::store::ModerationStore,
    error::{AppError, AppResult},
    models::{NewAuditLog, NewWarning, Warning, WarningType},
};

use super::{audit_repo::insert_audit, PgStore};

#[derive(Debug, FromRow)]
struct WarningRow {
    id: Uuid,
    user_id: Uuid,
    #[sqlx(rename = "type")]
    warning_type: String,
    reason: String,
    details: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    admin_id: Uuid,
    admin_name: String,
}

impl TryFrom<WarningRow> for Warning {
    type Error = AppError;

    fn try_from(row: WarningRow) -> Result<Self, Self::Error> {
        let warning_type = WarningType::from_str(&row.warning_type).ok_or_else(|| {
            AppError::Database(format!("Unknown warning type: {}", row.warning_type))
        })?;

        Ok(Warning {
            id: row.id,
            user_id: row.user_id,
            warning_type,
            reason: row.reason,
            details: row.details,
            is_active: row.is_active,
            created_at: row.created_at,
            expires_at: row.expires_at,
            admin_id: row.admin_id,
            admin_name: row.admin_name,
        })
    }
}

async fn insert_warning_row<'e, E>(executor: E, warning: NewWarning) -> AppResult<Warning>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, WarningRow>(
        r#"
        INSERT INTO warnings (
            id, user_id, type, reason, details, is_active,
            created_at, expires_at, admin_id, admin_name
        )
        VALUES ($1, $2, $3, $4, $5, TRUE, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(warning.user_id)
    .bind(warning.warning_type.as_str())
    .bind(&warning.reason)
    .bind(&warning.details)
    .bind(warning.created_at)
    .bind(warning.expires_at)
    .bind(warning.admin_id)
    .bind(&warning.admin_name)
    .fetch_one(executor)
    .await?;

    row.try_into()
}

#[async_trait]
impl ModerationStore for PgStore {
    async fn insert_warning(&self, warning: NewWarning) -> AppResult<Warning> {
        insert_warning_row(self.pool(), warning).await
    }

    async fn list_warnings(&self, user_id: Uuid) -> AppResult<Vec<Warning>> {
        let rows = sqlx::query_as::<_, WarningRow>(
            r#"SELECT * FROM warnings WHERE user_id = $1 ORDER BY created_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(Warning::try_from).collect()
    }

    async fn list_active_warnings(&self, user_id: Uuid) -> AppResult<Vec<Warning>> {
        let rows = sqlx::query_as::<_, WarningRow>(
            r#"
            SELECT * FROM warnings
            WHERE user_id = $1 AND is_active
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(Warning::try_from).collect()
    }

    async fn apply_ban(&self, ban: NewWarning, audit: NewAuditLog) -> AppResult<Warning> {
        let mut tx = self.pool().begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE users
            SET is_banned = TRUE, ban_reason = $2, ban_date = $3, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(ban.user_id)
        .bind(&ban.reason)
        .bind(ban.created_at)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let warning = insert_warning_row(&mut *tx, ban).await?;
        insert_audit(&mut *tx, audit).await?;
        tx.commit().await?;

        Ok(warning)
    }

    async fn lift_ban(&self, user_id: Uuid, audit: NewAuditLog) -> AppResult<u64> {
        let mut tx = self.pool().begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE users
            SET is_banned = FALSE, ban_reason = NULL, ban_date = NULL, updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(audit.timestamp)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let deactivated = sqlx::query(
            r#"
            UPDATE warnings
            SET is_active = FALSE
            WHERE user_id = $1 AND is_active AND type IN ('ban', 'suspension')
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        insert_audit(&mut *tx, audit).await?;
        tx.commit().await?;

        Ok(deactivated)
    }
}
