//! Background worker that publishes due scheduled uploads

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tokio::task::JoinHandle;

use crate::{
    config::SchedulerConfig,
    constants::ASSET_STORAGE_PREFIX,
    db::Store,
    error::AppError,
    models::{ScheduledUpload, UploadStatus},
    services::{download_service::{ObjectStorage, StorageError}, ScheduledUploadService},
    utils::Clock,
};

/// Why a publish attempt failed
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("File {0} is missing from storage")]
    MissingFile(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Makes a claimed upload live
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UploadPublisher: Send + Sync {
    async fn publish(&self, upload: &ScheduledUpload) -> Result<(), PublishError>;
}

/// Publisher that requires every declared file to be present in the bucket
pub struct StorageUploadPublisher {
    storage: Arc<dyn ObjectStorage>,
}

impl StorageUploadPublisher {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    /// Bucket path of a scheduled file
    pub fn object_path(upload: &ScheduledUpload, file_name: &str) -> String {
        format!("{}/{}/{}", ASSET_STORAGE_PREFIX, upload.asset_id, file_name)
    }
}

#[async_trait]
impl UploadPublisher for StorageUploadPublisher {
    async fn publish(&self, upload: &ScheduledUpload) -> Result<(), PublishError> {
        for file in &upload.files {
            let path = Self::object_path(upload, &file.name);
            if !self.storage.exists(&path).await? {
                return Err(PublishError::MissingFile(file.name.clone()));
            }
        }
        Ok(())
    }
}

/// Counts from one polling pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub claimed: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Polls the queue, claims due uploads and publishes them
pub struct UploadWorker {
    store: Arc<dyn Store>,
    publisher: Arc<dyn UploadPublisher>,
    clock: Arc<dyn Clock>,
    worker_id: String,
    lease: Duration,
    poll_interval: std::time::Duration,
}

impl UploadWorker {
    pub fn new(
        store: Arc<dyn Store>,
        publisher: Arc<dyn UploadPublisher>,
        clock: Arc<dyn Clock>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            store,
            publisher,
            clock,
            worker_id: config.worker_id.clone(),
            lease: Duration::seconds(config.lease_secs),
            poll_interval: std::time::Duration::from_secs(config.poll_interval_secs),
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// One polling pass over due uploads and expired claims
    pub async fn run_once(&self) -> WorkerReport {
        let store = &*self.store;
        let now = self.clock.now();

        let mut candidates = ScheduledUploadService::list_pending(store, now).await;
        candidates.extend(ScheduledUploadService::list_stale_claims(store, now).await);

        let mut report = WorkerReport::default();

        for candidate in candidates {
            let claimed = match ScheduledUploadService::claim(
                store,
                candidate.id,
                &self.worker_id,
                self.lease,
                self.clock.now(),
            )
            .await
            {
                Ok(Some(upload)) => upload,
                Ok(None) => {
                    tracing::debug!(upload_id = %candidate.id, "Upload claimed by another worker");
                    continue;
                }
                Err(e) => {
                    tracing::error!(upload_id = %candidate.id, error = %e, "Failed to claim upload");
                    continue;
                }
            };
            report.claimed += 1;

            let (status, error_message) = match self.publisher.publish(&claimed).await {
                Ok(()) => (UploadStatus::Completed, None),
                Err(e) => {
                    tracing::warn!(upload_id = %claimed.id, error = %e, "Scheduled upload failed");
                    (UploadStatus::Failed, Some(e.to_string()))
                }
            };

            match ScheduledUploadService::finish_claim(
                store,
                claimed.id,
                &self.worker_id,
                status,
                error_message,
                self.clock.now(),
            )
            .await
            {
                Ok(_) if status == UploadStatus::Completed => report.completed += 1,
                Ok(_) => report.failed += 1,
                Err(AppError::Conflict(_)) => {
                    tracing::warn!(
                        upload_id = %claimed.id,
                        worker_id = %self.worker_id,
                        "Claim taken over by another worker, dropping outcome"
                    );
                }
                Err(e) => {
                    tracing::error!(upload_id = %claimed.id, error = %e, "Failed to record upload outcome");
                }
            }
        }

        if report.claimed > 0 {
            tracing::info!(
                worker_id = %self.worker_id,
                claimed = report.claimed,
                completed = report.completed,
                failed = report.failed,
                "Scheduled upload pass finished"
            );
        }

        report
    }

    /// Run passes on a fixed interval until the task is aborted
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                worker_id = %self.worker_id,
                interval_secs = self.poll_interval.as_secs(),
                "Scheduled upload worker started"
            );

            let mut ticker = tokio::time::interval(self.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                self.run_once().await;
            }
        })
    }
}
