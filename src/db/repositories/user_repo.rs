//! User repository

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::store::UserStore,
    error::{AppError, AppResult},
    models::{NewAuditLog, NewUser, User},
};

use super::{audit_repo::insert_audit, PgStore};

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash, display_name, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(&user.role)
        .bind(user.created_at)
        .fetch_one(self.pool())
        .await?;

        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE id = $1"#)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(user)
    }

    async fn find_user_by_identifier(&self, identifier: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT * FROM users WHERE username = $1 OR email = $1"#,
        )
        .bind(identifier)
        .fetch_optional(self.pool())
        .await?;

        Ok(user)
    }

    async fn list_users(&self, search: Option<String>) -> AppResult<Vec<User>> {
        let search_pattern = search.map(|s| format!("%{}%", s));

        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE
                $1::text IS NULL
                OR username ILIKE $1
                OR email ILIKE $1
                OR display_name ILIKE $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(&search_pattern)
        .fetch_all(self.pool())
        .await?;

        Ok(users)
    }

    async fn change_role(&self, id: Uuid, role: String, audit: NewAuditLog) -> AppResult<User> {
        let mut tx = self.pool().begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET role = $2, updated_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&role)
        .bind(audit.timestamp)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        insert_audit(&mut *tx, audit).await?;
        tx.commit().await?;

        Ok(user)
    }
}
