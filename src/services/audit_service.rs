//! Audit log service

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    db::AuditLogStore,
    error::AppResult,
    models::{AuditAction, AuditDetails, AuditLog, NewAuditLog, User},
};

/// An administrative action to record
#[derive(Debug, Clone)]
pub struct ActionRecord {
    pub action: AuditAction,
    pub target_user_id: Option<Uuid>,
    pub target_user_name: Option<String>,
    pub reason: Option<String>,
    pub details: Option<AuditDetails>,
}

/// Audit log service
pub struct AuditService;

impl AuditService {
    /// Append an entry on behalf of `actor`; failures propagate
    pub async fn record_action<S: AuditLogStore + ?Sized>(
        store: &S,
        actor: &User,
        record: ActionRecord,
        now: DateTime<Utc>,
    ) -> AppResult<AuditLog> {
        let entry = store
            .append_audit(NewAuditLog {
                action: record.action,
                performed_by: actor.id,
                performed_by_name: actor.public_name().to_string(),
                target_user_id: record.target_user_id,
                target_user_name: record.target_user_name,
                reason: record.reason,
                details: record.details,
                timestamp: now,
            })
            .await?;

        tracing::info!(
            action = %entry.action,
            performed_by = %entry.performed_by,
            "Audit entry recorded"
        );

        Ok(entry)
    }

    /// Every entry, newest first; empty on store failure
    pub async fn list_all<S: AuditLogStore + ?Sized>(store: &S) -> Vec<AuditLog> {
        match store.list_audit_logs().await {
            Ok(logs) => logs,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list audit logs");
                Vec::new()
            }
        }
    }

    /// Entries targeting one user, newest first; empty on store failure
    pub async fn list_for_user<S: AuditLogStore + ?Sized>(
        store: &S,
        target_user_id: Uuid,
    ) -> Vec<AuditLog> {
        match store.list_audit_logs_for_user(target_user_id).await {
            Ok(logs) => logs,
            Err(e) => {
                tracing::error!(error = %e, target_user_id = %target_user_id, "Failed to list audit logs");
                Vec::new()
            }
        }
    }
}
