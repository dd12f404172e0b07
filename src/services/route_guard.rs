//! Route guard and ban notice
//!
//! The guard is evaluated fresh for every navigation; nothing is cached
//! between requests.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::ModerationStore,
    models::{Warning, WarningType},
};

/// Result of a completed guard check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardOutcome {
    Proceed,
    RedirectToBanNotice,
}

/// Guard lifecycle: `Checking` until the warning lookup returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Checking,
    Resolved(GuardOutcome),
}

/// Per-navigation guard for one session
#[derive(Debug)]
pub struct RouteGuard {
    user_id: Uuid,
    state: GuardState,
}

impl RouteGuard {
    /// Start a check for the session's user
    pub fn begin(user_id: Uuid) -> Self {
        Self {
            user_id,
            state: GuardState::Checking,
        }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    /// Resolve from the user's active warnings
    ///
    /// A failed lookup resolves to `Proceed`.
    pub async fn resolve<S: ModerationStore + ?Sized>(mut self, store: &S) -> Self {
        let outcome = match store.list_active_warnings(self.user_id).await {
            Ok(active) if active.iter().any(Warning::blocks_access) => {
                GuardOutcome::RedirectToBanNotice
            }
            Ok(_) => GuardOutcome::Proceed,
            Err(e) => {
                tracing::error!(user_id = %self.user_id, error = %e, "Warning lookup failed, allowing navigation");
                GuardOutcome::Proceed
            }
        };

        self.state = GuardState::Resolved(outcome);
        self
    }

    /// Outcome once resolved
    pub fn outcome(&self) -> Option<GuardOutcome> {
        match self.state {
            GuardState::Checking => None,
            GuardState::Resolved(outcome) => Some(outcome),
        }
    }

    /// Begin and resolve in one step
    pub async fn evaluate<S: ModerationStore + ?Sized>(store: &S, user_id: Uuid) -> GuardOutcome {
        Self::begin(user_id)
            .resolve(store)
            .await
            .outcome()
            .unwrap_or(GuardOutcome::Proceed)
    }
}

/// What a banned or suspended user is shown
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BanNotice {
    pub title: String,
    pub account_status: String,
    #[serde(rename = "type")]
    pub warning_type: WarningType,
    pub reason: String,
    pub details: Option<String>,
    pub reviewed_at: DateTime<Utc>,
    pub reviewed_by: String,
    pub reactivation_date: Option<DateTime<Utc>>,
    pub days_remaining: Option<i64>,
    pub permanent: bool,
}

impl BanNotice {
    /// Pick the record to show: an active ban, else the newest active suspension
    pub fn select(active: &[Warning]) -> Option<&Warning> {
        active
            .iter()
            .find(|w| w.is_active && w.warning_type == WarningType::Ban)
            .or_else(|| {
                active
                    .iter()
                    .filter(|w| w.is_active && w.warning_type == WarningType::Suspension)
                    .max_by_key(|w| w.created_at)
            })
    }

    pub fn from_warning(warning: &Warning, now: DateTime<Utc>) -> Self {
        let permanent = warning.warning_type == WarningType::Ban;

        let days_remaining = match warning.warning_type {
            WarningType::Suspension => warning.expires_at.map(|at| ceil_days(at - now)),
            _ => None,
        };

        let title = match (warning.warning_type, days_remaining) {
            (WarningType::Ban, _) => "Permanently Banned".to_string(),
            (WarningType::Suspension, Some(days)) => format!("Suspended for {} Days", days),
            (WarningType::Suspension, None) => "Suspended".to_string(),
            (WarningType::Warning, _) => "Account Warning".to_string(),
        };

        let account_status = if permanent {
            "Permanently Disabled"
        } else {
            "Temporarily Suspended"
        };

        Self {
            title,
            account_status: account_status.to_string(),
            warning_type: warning.warning_type,
            reason: warning.reason.clone(),
            details: warning.details.clone(),
            reviewed_at: warning.created_at,
            reviewed_by: warning.admin_name.clone(),
            reactivation_date: if permanent { None } else { warning.expires_at },
            days_remaining,
            permanent,
        }
    }
}

fn ceil_days(remaining: chrono::Duration) -> i64 {
    const DAY_MS: i64 = 24 * 60 * 60 * 1000;
    let ms = remaining.num_milliseconds();
    ms.div_euclid(DAY_MS) + i64::from(ms.rem_euclid(DAY_MS) != 0)
}
