//! Moderation warning model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of moderation record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningType {
    Warning,
    Suspension,
    Ban,
}

impl WarningType {
    /// Get warning type as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Suspension => "suspension",
            Self::Ban => "ban",
        }
    }

    /// Parse warning type from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "warning" => Some(Self::Warning),
            "suspension" => Some(Self::Suspension),
            "ban" => Some(Self::Ban),
            _ => None,
        }
    }

    /// Whether an active record of this type locks the user out
    pub fn blocks_access(&self) -> bool {
        matches!(self, Self::Suspension | Self::Ban)
    }
}

impl std::fmt::Display for WarningType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Moderation record attached to a user
///
/// A ban never carries `expires_at`. An elapsed `expires_at` on a suspension
/// does not flip `is_active`; only an explicit unban does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub warning_type: WarningType,
    pub reason: String,
    pub details: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub admin_id: Uuid,
    pub admin_name: String,
}

impl Warning {
    /// Whether this record should gate navigation
    pub fn blocks_access(&self) -> bool {
        self.is_active && self.warning_type.blocks_access()
    }

    /// Whether the suspension window has passed (informational only)
    pub fn has_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Fields needed to insert a warning
#[derive(Debug, Clone)]
pub struct NewWarning {
    pub user_id: Uuid,
    pub warning_type: WarningType,
    pub reason: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub admin_id: Uuid,
    pub admin_name: String,
}

impl NewWarning {
    /// Materialize the record with a fresh id
    pub fn into_warning(self) -> Warning {
        Warning {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            warning_type: self.warning_type,
            reason: self.reason,
            details: self.details,
            is_active: true,
            created_at: self.created_at,
            expires_at: self.expires_at,
            admin_id: self.admin_id,
            admin_name: self.admin_name,
        }
    }
}
