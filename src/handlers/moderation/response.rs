//! Moderation response DTOs

use serde::Serialize;

use crate::{models::Warning, services::GuardOutcome};

/// Warning list response
#[derive(Debug, Serialize)]
pub struct WarningListResponse {
    pub warnings: Vec<Warning>,
    pub total: usize,
}

/// Route guard verdict for one navigation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardResponse {
    pub state: &'static str,
    pub outcome: GuardOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<&'static str>,
}
