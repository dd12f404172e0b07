//! Scheduled upload request DTOs

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    constants::MAX_CHANGE_NOTES_LENGTH,
    models::FileDescriptor,
    services::scheduled_upload_service::PublishTime,
};

/// Schedule an asset file publish
///
/// The publish time is `immediate`, an exact `scheduledFor` instant, or a
/// `date` plus `time` pair read as UTC, checked in that order.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleUploadRequest {
    pub asset_id: Uuid,

    pub files: Vec<FileDescriptor>,

    #[serde(default)]
    #[validate(length(max = MAX_CHANGE_NOTES_LENGTH))]
    pub change_notes: String,

    #[serde(default)]
    pub immediate: bool,

    pub scheduled_for: Option<DateTime<Utc>>,

    pub date: Option<String>,

    pub time: Option<String>,
}

impl ScheduleUploadRequest {
    pub fn publish_time(&self) -> PublishTime {
        if self.immediate {
            return PublishTime::Immediate;
        }

        match self.scheduled_for {
            Some(at) => PublishTime::At(at),
            None => PublishTime::DateAndTime {
                date: self.date.clone().unwrap_or_default(),
                time: self.time.clone().unwrap_or_default(),
            },
        }
    }
}
