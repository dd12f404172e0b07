//! Moderation service
//!
//! Bans, suspensions, warnings and role changes. Every mutating call loads the
//! acting user from the store, so a revoked moderator loses access even while
//! holding a valid token.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    constants::MAX_SUSPENSION_HOURS,
    db::{AuditLogStore, ModerationStore, UserStore},
    error::{AppError, AppResult},
    models::{AuditAction, AuditDetails, NewAuditLog, NewWarning, User, Warning, WarningType},
    utils::validate_role,
};

/// Non-ban moderation record to issue
#[derive(Debug, Clone)]
pub struct IssueWarning {
    pub warning_type: WarningType,
    pub reason: String,
    pub details: Option<String>,
    pub duration_hours: Option<i64>,
}

/// Moderation service
pub struct ModerationService;

impl ModerationService {
    /// Load the acting user and require a moderator role
    pub async fn require_moderator<S: UserStore + ?Sized>(store: &S, actor_id: Uuid) -> AppResult<User> {
        let actor = store
            .find_user_by_id(actor_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !actor.is_moderator() {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }

        Ok(actor)
    }

    /// Ban a user: ban fields, an active ban record and a `user_banned` entry
    pub async fn ban<S>(
        store: &S,
        actor: &User,
        target_id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Warning>
    where
        S: UserStore + ModerationStore + ?Sized,
    {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation("Ban reason is required".to_string()));
        }

        if actor.id == target_id {
            return Err(AppError::Forbidden("You cannot ban yourself".to_string()));
        }

        let target = Self::load_target(store, target_id).await?;
        if target.is_banned {
            return Err(AppError::Conflict("User is already banned".to_string()));
        }

        let ban = NewWarning {
            user_id: target.id,
            warning_type: WarningType::Ban,
            reason: reason.to_string(),
            details: None,
            created_at: now,
            expires_at: None,
            admin_id: actor.id,
            admin_name: actor.public_name().to_string(),
        };

        let audit = NewAuditLog {
            action: AuditAction::UserBanned,
            performed_by: actor.id,
            performed_by_name: actor.public_name().to_string(),
            target_user_id: Some(target.id),
            target_user_name: Some(target.public_name().to_string()),
            reason: Some(reason.to_string()),
            details: None,
            timestamp: now,
        };

        let warning = store.apply_ban(ban, audit).await?;

        tracing::info!(
            target_user_id = %target.id,
            admin_id = %actor.id,
            "User banned"
        );

        Ok(warning)
    }

    /// Lift a ban and any active suspension; returns the number of records deactivated
    pub async fn unban<S>(store: &S, actor: &User, target_id: Uuid, now: DateTime<Utc>) -> AppResult<u64>
    where
        S: UserStore + ModerationStore + ?Sized,
    {
        let target = Self::load_target(store, target_id).await?;

        let blocked = store
            .list_active_warnings(target.id)
            .await?
            .iter()
            .any(Warning::blocks_access);

        if !target.is_banned && !blocked {
            return Err(AppError::Conflict(
                "User has no active ban or suspension".to_string(),
            ));
        }

        let audit = NewAuditLog {
            action: AuditAction::UserUnbanned,
            performed_by: actor.id,
            performed_by_name: actor.public_name().to_string(),
            target_user_id: Some(target.id),
            target_user_name: Some(target.public_name().to_string()),
            reason: None,
            details: None,
            timestamp: now,
        };

        let deactivated = store.lift_ban(target.id, audit).await?;

        tracing::info!(
            target_user_id = %target.id,
            admin_id = %actor.id,
            deactivated,
            "User unbanned"
        );

        Ok(deactivated)
    }

    /// Issue a warning or a timed suspension
    pub async fn issue_warning<S>(
        store: &S,
        actor: &User,
        target_id: Uuid,
        request: IssueWarning,
        now: DateTime<Utc>,
    ) -> AppResult<Warning>
    where
        S: UserStore + ModerationStore + ?Sized,
    {
        let reason = request.reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation("Reason is required".to_string()));
        }

        let expires_at = match request.warning_type {
            WarningType::Ban => {
                return Err(AppError::Validation(
                    "Bans must be issued through the ban action".to_string(),
                ));
            }
            WarningType::Warning => None,
            WarningType::Suspension => match request.duration_hours {
                Some(hours) if (1..=MAX_SUSPENSION_HOURS).contains(&hours) => {
                    Some(now + Duration::hours(hours))
                }
                _ => {
                    return Err(AppError::Validation(format!(
                        "Suspension duration must be between 1 and {} hours",
                        MAX_SUSPENSION_HOURS
                    )));
                }
            },
        };

        if actor.id == target_id {
            return Err(AppError::Forbidden("You cannot moderate yourself".to_string()));
        }

        let target = Self::load_target(store, target_id).await?;

        let warning = store
            .insert_warning(NewWarning {
                user_id: target.id,
                warning_type: request.warning_type,
                reason: reason.to_string(),
                details: request.details.filter(|d| !d.trim().is_empty()),
                created_at: now,
                expires_at,
                admin_id: actor.id,
                admin_name: actor.public_name().to_string(),
            })
            .await?;

        tracing::info!(
            target_user_id = %target.id,
            admin_id = %actor.id,
            warning_type = %warning.warning_type,
            "Moderation record issued"
        );

        Ok(warning)
    }

    /// Change a user's role and record `role_changed` with `{from, to}`
    pub async fn change_role<S>(
        store: &S,
        actor: &User,
        target_id: Uuid,
        role: &str,
        now: DateTime<Utc>,
    ) -> AppResult<User>
    where
        S: UserStore + AuditLogStore + ?Sized,
    {
        validate_role(role).map_err(|e| AppError::Validation(e.to_string()))?;

        if actor.id == target_id {
            return Err(AppError::Forbidden("You cannot change your own role".to_string()));
        }

        let target = store
            .find_user_by_id(target_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if target.role == role {
            return Ok(target);
        }

        let mut details = AuditDetails::new();
        details.insert("from".to_string(), target.role.clone().into());
        details.insert("to".to_string(), role.to_string().into());

        let audit = NewAuditLog {
            action: AuditAction::RoleChanged,
            performed_by: actor.id,
            performed_by_name: actor.public_name().to_string(),
            target_user_id: Some(target.id),
            target_user_name: Some(target.public_name().to_string()),
            reason: None,
            details: Some(details),
            timestamp: now,
        };

        let updated = store.change_role(target.id, role.to_string(), audit).await?;

        tracing::info!(
            target_user_id = %target.id,
            admin_id = %actor.id,
            from = %target.role,
            to = %updated.role,
            "Role changed"
        );

        Ok(updated)
    }

    /// Active records for the user, no expiry filtering
    pub async fn get_active_warnings<S: ModerationStore + ?Sized>(
        store: &S,
        user_id: Uuid,
    ) -> AppResult<Vec<Warning>> {
        store.list_active_warnings(user_id).await
    }

    /// All records for the user, newest first
    pub async fn list_warnings<S: ModerationStore + ?Sized>(
        store: &S,
        user_id: Uuid,
    ) -> AppResult<Vec<Warning>> {
        store.list_warnings(user_id).await
    }

    async fn load_target<S: UserStore + ?Sized>(store: &S, target_id: Uuid) -> AppResult<User> {
        store
            .find_user_by_id(target_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}
