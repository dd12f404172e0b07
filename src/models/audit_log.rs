//! Audit log model

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Administrative action recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    UserBanned,
    UserUnbanned,
    RoleChanged,
    TicketResolved,
    TicketAssigned,
}

impl AuditAction {
    /// Get action as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserBanned => "user_banned",
            Self::UserUnbanned => "user_unbanned",
            Self::RoleChanged => "role_changed",
            Self::TicketResolved => "ticket_resolved",
            Self::TicketAssigned => "ticket_assigned",
        }
    }

    /// Parse action from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user_banned" => Some(Self::UserBanned),
            "user_unbanned" => Some(Self::UserUnbanned),
            "role_changed" => Some(Self::RoleChanged),
            "ticket_resolved" => Some(Self::TicketResolved),
            "ticket_assigned" => Some(Self::TicketAssigned),
            _ => None,
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Free-form key/value details attached to an entry
pub type AuditDetails = BTreeMap<String, serde_json::Value>;

/// Append-only audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: Uuid,
    pub action: AuditAction,
    pub performed_by: Uuid,
    pub performed_by_name: String,
    pub target_user_id: Option<Uuid>,
    pub target_user_name: Option<String>,
    pub reason: Option<String>,
    pub details: Option<AuditDetails>,
    pub timestamp: DateTime<Utc>,
}

/// Fields needed to append an audit entry
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditLog {
    pub action: AuditAction,
    pub performed_by: Uuid,
    pub performed_by_name: String,
    pub target_user_id: Option<Uuid>,
    pub target_user_name: Option<String>,
    pub reason: Option<String>,
    pub details: Option<AuditDetails>,
    pub timestamp: DateTime<Utc>,
}

impl NewAuditLog {
    /// Materialize the entry with a fresh id
    pub fn into_log(self) -> AuditLog {
        AuditLog {
            id: Uuid::new_v4(),
            action: self.action,
            performed_by: self.performed_by,
            performed_by_name: self.performed_by_name,
            target_user_id: self.target_user_id,
            target_user_name: self.target_user_name,
            reason: self.reason,
            details: self.details,
            timestamp: self.timestamp,
        }
    }
}
