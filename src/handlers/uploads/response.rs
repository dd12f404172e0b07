//! Scheduled upload response DTOs

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{models::ScheduledUpload, utils::format_time_remaining};

/// Scheduled upload with its display countdown
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledUploadResponse {
    #[serde(flatten)]
    pub upload: ScheduledUpload,
    pub time_remaining: String,
}

impl ScheduledUploadResponse {
    pub fn new(upload: ScheduledUpload, now: DateTime<Utc>) -> Self {
        Self {
            time_remaining: format_time_remaining(upload.scheduled_for, now),
            upload,
        }
    }
}

/// Scheduled upload list response
#[derive(Debug, Serialize)]
pub struct ScheduledUploadListResponse {
    pub uploads: Vec<ScheduledUploadResponse>,
    pub total: usize,
}

impl ScheduledUploadListResponse {
    pub fn new(uploads: Vec<ScheduledUpload>, now: DateTime<Utc>) -> Self {
        let uploads: Vec<_> = uploads
            .into_iter()
            .map(|u| ScheduledUploadResponse::new(u, now))
            .collect();

        Self {
            total: uploads.len(),
            uploads,
        }
    }
}
