//! Business logic services

pub mod audit_service;
pub mod auth_service;
pub mod download_service;
pub mod moderation_service;
pub mod nsfw_service;
pub mod route_guard;
pub mod scheduled_upload_service;
pub mod upload_worker;

pub use audit_service::AuditService;
pub use auth_service::AuthService;
pub use download_service::{HttpObjectStorage, MemoryObjectStorage, ObjectStorage};
pub use moderation_service::ModerationService;
pub use nsfw_service::{HttpNsfwDetector, NsfwCheckLog, NsfwDetector, NsfwService};
pub use route_guard::{BanNotice, GuardOutcome, RouteGuard};
pub use scheduled_upload_service::ScheduledUploadService;
pub use upload_worker::{StorageUploadPublisher, UploadWorker};
