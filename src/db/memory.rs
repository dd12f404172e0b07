//! In-memory store implementation
//!
//! Backs local development (`STORE_BACKEND=memory`) and the test suite.
//! Each trait method takes the single table lock for its whole body, which
//! gives the same all-or-nothing behavior the Postgres store gets from
//! transactions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    db::store::{AuditLogStore, ModerationStore, ScheduledUploadStore, UserStore},
    error::{AppError, AppResult},
    models::{
        AuditLog, NewAuditLog, NewScheduledUpload, NewUser, NewWarning, ScheduledUpload, UploadClaim,
        UploadStatus, User, Warning, WarningType,
    },
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    warnings: Vec<Warning>,
    audit_logs: Vec<AuditLog>,
    uploads: Vec<ScheduledUpload>,
}

/// Store that keeps every table in process memory
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest-first copy where ties keep the most recent insertion first
fn newest_first<T: Clone, K: Ord>(items: &[T], key: impl Fn(&T) -> K) -> Vec<T> {
    let mut out: Vec<T> = items.iter().rev().cloned().collect();
    out.sort_by(|a, b| key(b).cmp(&key(a)));
    out
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut tables = self.tables.lock().await;

        if tables
            .users
            .iter()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(AppError::AlreadyExists("Resource already exists".to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            display_name: user.display_name,
            role: user.role,
            is_banned: false,
            ban_reason: None,
            ban_date: None,
            created_at: user.created_at,
            updated_at: user.created_at,
        };
        tables.users.push(user.clone());

        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_identifier(&self, identifier: &str) -> AppResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.username == identifier || u.email == identifier)
            .cloned())
    }

    async fn list_users(&self, search: Option<String>) -> AppResult<Vec<User>> {
        let tables = self.tables.lock().await;
        let needle = search.map(|s| s.to_lowercase());

        let matching: Vec<User> = tables
            .users
            .iter()
            .filter(|u| match &needle {
                Some(n) => {
                    u.username.to_lowercase().contains(n)
                        || u.email.to_lowercase().contains(n)
                        || u
                            .display_name
                            .as_deref()
                            .is_some_and(|d| d.to_lowercase().contains(n))
                }
                None => true,
            })
            .cloned()
            .collect();

        Ok(newest_first(&matching, |u| u.created_at))
    }

    async fn change_role(&self, id: Uuid, role: String, audit: NewAuditLog) -> AppResult<User> {
        let mut tables = self.tables.lock().await;

        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        user.role = role;
        user.updated_at = audit.timestamp;
        let user = user.clone();

        tables.audit_logs.push(audit.into_log());

        Ok(user)
    }
}

#[async_trait]
impl ModerationStore for MemoryStore {
    async fn insert_warning(&self, warning: NewWarning) -> AppResult<Warning> {
        let mut tables = self.tables.lock().await;

        if !tables.users.iter().any(|u| u.id == warning.user_id) {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let warning = warning.into_warning();
        tables.warnings.push(warning.clone());
        Ok(warning)
    }

    async fn list_warnings(&self, user_id: Uuid) -> AppResult<Vec<Warning>> {
        let tables = self.tables.lock().await;
        let mine: Vec<Warning> = tables
            .warnings
            .iter()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(&mine, |w| w.created_at))
    }

    async fn list_active_warnings(&self, user_id: Uuid) -> AppResult<Vec<Warning>> {
        let tables = self.tables.lock().await;
        let active: Vec<Warning> = tables
            .warnings
            .iter()
            .filter(|w| w.user_id == user_id && w.is_active)
            .cloned()
            .collect();
        Ok(newest_first(&active, |w| w.created_at))
    }

    async fn apply_ban(&self, ban: NewWarning, audit: NewAuditLog) -> AppResult<Warning> {
        let mut tables = self.tables.lock().await;

        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == ban.user_id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        user.is_banned = true;
        user.ban_reason = Some(ban.reason.clone());
        user.ban_date = Some(ban.created_at);
        user.updated_at = ban.created_at;

        let warning = ban.into_warning();
        tables.warnings.push(warning.clone());
        tables.audit_logs.push(audit.into_log());

        Ok(warning)
    }

    async fn lift_ban(&self, user_id: Uuid, audit: NewAuditLog) -> AppResult<u64> {
        let mut tables = self.tables.lock().await;

        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        user.is_banned = false;
        user.ban_reason = None;
        user.ban_date = None;
        user.updated_at = audit.timestamp;

        let mut deactivated = 0;
        for warning in tables.warnings.iter_mut().filter(|w| {
            w.user_id == user_id
                && w.is_active
                && matches!(w.warning_type, WarningType::Ban | WarningType::Suspension)
        }) {
            warning.is_active = false;
            deactivated += 1;
        }

        tables.audit_logs.push(audit.into_log());

        Ok(deactivated)
    }
}

#[async_trait]
impl AuditLogStore for MemoryStore {
    async fn append_audit(&self, entry: NewAuditLog) -> AppResult<AuditLog> {
        let mut tables = self.tables.lock().await;
        let log = entry.into_log();
        tables.audit_logs.push(log.clone());
        Ok(log)
    }

    async fn list_audit_logs(&self) -> AppResult<Vec<AuditLog>> {
        let tables = self.tables.lock().await;
        Ok(newest_first(&tables.audit_logs, |l| l.timestamp))
    }

    async fn list_audit_logs_for_user(&self, target_user_id: Uuid) -> AppResult<Vec<AuditLog>> {
        let tables = self.tables.lock().await;
        let targeted: Vec<AuditLog> = tables
            .audit_logs
            .iter()
            .filter(|l| l.target_user_id == Some(target_user_id))
            .cloned()
            .collect();
        Ok(newest_first(&targeted, |l| l.timestamp))
    }
}

#[async_trait]
impl ScheduledUploadStore for MemoryStore {
    async fn insert_upload(&self, upload: NewScheduledUpload) -> AppResult<ScheduledUpload> {
        let mut tables = self.tables.lock().await;
        let upload = upload.into_upload();
        tables.uploads.push(upload.clone());
        Ok(upload)
    }

    async fn find_upload(&self, id: Uuid) -> AppResult<Option<ScheduledUpload>> {
        let tables = self.tables.lock().await;
        Ok(tables.uploads.iter().find(|u| u.id == id).cloned())
    }

    async fn list_uploads_for_user(&self, user_id: Uuid) -> AppResult<Vec<ScheduledUpload>> {
        let tables = self.tables.lock().await;
        let mine: Vec<ScheduledUpload> = tables
            .uploads
            .iter()
            .filter(|u| u.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(&mine, |u| u.scheduled_for))
    }

    async fn list_uploads_by_status(&self, status: UploadStatus) -> AppResult<Vec<ScheduledUpload>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .uploads
            .iter()
            .filter(|u| u.status == status)
            .cloned()
            .collect())
    }

    async fn transition_upload(
        &self,
        id: Uuid,
        from: UploadStatus,
        to: UploadStatus,
        error_message: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<ScheduledUpload>> {
        let mut tables = self.tables.lock().await;

        let Some(upload) = tables
            .uploads
            .iter_mut()
            .find(|u| u.id == id && u.status == from)
        else {
            return Ok(None);
        };

        upload.status = to;
        upload.error_message = error_message;
        upload.updated_at = now;
        if to.is_terminal() {
            upload.lease_expires_at = None;
        }

        Ok(Some(upload.clone()))
    }

    async fn finish_claimed_upload(
        &self,
        id: Uuid,
        worker_id: &str,
        to: UploadStatus,
        error_message: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<ScheduledUpload>> {
        let mut tables = self.tables.lock().await;

        let Some(upload) = tables.uploads.iter_mut().find(|u| {
            u.id == id
                && u.status == UploadStatus::Processing
                && u.claimed_by.as_deref() == Some(worker_id)
        }) else {
            return Ok(None);
        };

        upload.status = to;
        upload.error_message = error_message;
        upload.updated_at = now;
        upload.lease_expires_at = None;

        Ok(Some(upload.clone()))
    }

    async fn claim_upload(
        &self,
        id: Uuid,
        claim: UploadClaim,
        now: DateTime<Utc>,
    ) -> AppResult<Option<ScheduledUpload>> {
        let mut tables = self.tables.lock().await;

        let Some(upload) = tables
            .uploads
            .iter_mut()
            .find(|u| u.id == id && (u.is_due(now) || u.has_stale_claim(now)))
        else {
            return Ok(None);
        };

        upload.status = UploadStatus::Processing;
        upload.claimed_by = Some(claim.worker_id);
        upload.lease_expires_at = Some(claim.lease_expires_at);
        upload.updated_at = now;

        Ok(Some(upload.clone()))
    }

    async fn delete_upload(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.lock().await;
        let before = tables.uploads.len();
        tables.uploads.retain(|u| u.id != id);
        Ok(tables.uploads.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuditAction, FileDescriptor};
    use chrono::Duration;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password_hash: "hash".to_string(),
            display_name: None,
            role: "member".to_string(),
            created_at: Utc::now(),
        }
    }

    fn new_upload(user_id: Uuid, scheduled_for: DateTime<Utc>) -> NewScheduledUpload {
        NewScheduledUpload {
            asset_id: Uuid::new_v4(),
            user_id,
            files: vec![FileDescriptor {
                name: "pack.zip".to_string(),
                size: 10,
                content_type: "application/zip".to_string(),
            }],
            change_notes: String::new(),
            scheduled_for,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = MemoryStore::new();
        store.create_user(new_user("alice")).await.unwrap();

        let err = store.create_user(new_user("alice")).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_list_for_user_orders_most_future_first() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let now = Utc::now();

        store.insert_upload(new_upload(user, now + Duration::hours(1))).await.unwrap();
        store.insert_upload(new_upload(user, now + Duration::hours(3))).await.unwrap();
        store.insert_upload(new_upload(user, now + Duration::hours(2))).await.unwrap();
        store.insert_upload(new_upload(Uuid::new_v4(), now)).await.unwrap();

        let listed = store.list_uploads_for_user(user).await.unwrap();
        let hours: Vec<i64> = listed
            .iter()
            .map(|u| (u.scheduled_for - now).num_hours())
            .collect();
        assert_eq!(hours, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_transition_requires_expected_status() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let upload = store.insert_upload(new_upload(Uuid::new_v4(), now)).await.unwrap();

        let moved = store
            .transition_upload(upload.id, UploadStatus::Processing, UploadStatus::Completed, None, now)
            .await
            .unwrap();
        assert!(moved.is_none());

        let moved = store
            .transition_upload(upload.id, UploadStatus::Scheduled, UploadStatus::Cancelled, None, now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved.status, UploadStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_claim_is_exclusive_until_lease_expires() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let upload = store.insert_upload(new_upload(Uuid::new_v4(), now)).await.unwrap();

        let lease = |worker: &str| UploadClaim {
            worker_id: worker.to_string(),
            lease_expires_at: now + Duration::minutes(5),
        };

        let first = store.claim_upload(upload.id, lease("a"), now).await.unwrap();
        assert_eq!(first.unwrap().claimed_by.as_deref(), Some("a"));

        let second = store.claim_upload(upload.id, lease("b"), now).await.unwrap();
        assert!(second.is_none());

        let later = now + Duration::minutes(6);
        let reclaimed = store
            .claim_upload(
                upload.id,
                UploadClaim {
                    worker_id: "b".to_string(),
                    lease_expires_at: later + Duration::minutes(5),
                },
                later,
            )
            .await
            .unwrap();
        assert_eq!(reclaimed.unwrap().claimed_by.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_claim_ignores_future_uploads() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let upload = store
            .insert_upload(new_upload(Uuid::new_v4(), now + Duration::minutes(10)))
            .await
            .unwrap();

        let claim = UploadClaim {
            worker_id: "a".to_string(),
            lease_expires_at: now + Duration::minutes(5),
        };
        assert!(store.claim_upload(upload.id, claim, now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ban_for_unknown_user_writes_nothing() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let target = Uuid::new_v4();
        let admin = Uuid::new_v4();

        let ban = NewWarning {
            user_id: target,
            warning_type: WarningType::Ban,
            reason: "fraud".to_string(),
            details: None,
            created_at: now,
            expires_at: None,
            admin_id: admin,
            admin_name: "root".to_string(),
        };
        let audit = NewAuditLog {
            action: AuditAction::UserBanned,
            performed_by: admin,
            performed_by_name: "root".to_string(),
            target_user_id: Some(target),
            target_user_name: None,
            reason: Some("fraud".to_string()),
            details: None,
            timestamp: now,
        };

        assert!(store.apply_ban(ban, audit).await.is_err());
        assert!(store.list_audit_logs().await.unwrap().is_empty());
        assert!(store.list_warnings(target).await.unwrap().is_empty());
    }
}
