//! Application-wide constants
//!
//! This module contains all constant values used throughout the application.
//! Constants are grouped by their purpose for better organization.

// =============================================================================
// SERVER DEFAULTS
// =============================================================================

/// Default server host address
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default server port
pub const DEFAULT_SERVER_PORT: u16 = 8080;

// =============================================================================
// DATABASE DEFAULTS
// =============================================================================

/// Default maximum database connections in the pool
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 20;

// =============================================================================
// AUTHENTICATION DEFAULTS
// =============================================================================

/// Default JWT token expiry in hours
pub const DEFAULT_JWT_EXPIRY_HOURS: i64 = 24;

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: u64 = 8;

/// Maximum password length
pub const MAX_PASSWORD_LENGTH: u64 = 128;

/// Username minimum length
pub const MIN_USERNAME_LENGTH: u64 = 3;

/// Username maximum length
pub const MAX_USERNAME_LENGTH: u64 = 32;

// =============================================================================
// OBJECT STORAGE DEFAULTS
// =============================================================================

/// Default object storage REST base (bucket is appended)
pub const DEFAULT_STORAGE_BASE_URL: &str = "https://firebasestorage.googleapis.com/v0/b";

/// Default storage bucket
pub const DEFAULT_STORAGE_BUCKET: &str = "marketplace-assets";

/// Prefix under which asset files are stored
pub const ASSET_STORAGE_PREFIX: &str = "assets";

/// Cache-Control header sent with proxied downloads
pub const DOWNLOAD_CACHE_CONTROL: &str = "public, max-age=3600";

// =============================================================================
// NSFW CHECK DEFAULTS
// =============================================================================

/// Default detection service endpoint
pub const DEFAULT_NSFW_DETECTOR_URL: &str = "http://localhost:5000/classify";

/// Confidence at or above which a flagged category rejects the image
pub const DEFAULT_NSFW_THRESHOLD: f64 = 0.7;

/// Checks allowed per user per window
pub const DEFAULT_NSFW_CHECKS_PER_MINUTE: u32 = 30;

/// Rate limit window in seconds
pub const NSFW_RATE_WINDOW_SECS: i64 = 60;

/// Key used when a check carries no userId
pub const ANONYMOUS_USER_KEY: &str = "anonymous";

/// Categories the detection service reports as prohibited
pub const NSFW_FLAGGED_CATEGORIES: &[&str] = &["porn", "hentai", "sexy"];

/// Number of recent checks kept for the admin audit view
pub const NSFW_CHECK_LOG_CAPACITY: usize = 1000;

/// Default page size for the admin audit view
pub const NSFW_AUDIT_DEFAULT_LIMIT: usize = 100;

/// Largest image accepted by the pre-check (10MB)
pub const NSFW_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

// =============================================================================
// SCHEDULED UPLOADS
// =============================================================================

/// Default interval between worker polls
pub const DEFAULT_SCHEDULER_POLL_INTERVAL_SECS: u64 = 60;

/// Default lease a worker holds on a claimed job
pub const DEFAULT_SCHEDULER_LEASE_SECS: i64 = 300;

/// Offset applied when a user asks for an immediate publish
pub const IMMEDIATE_SCHEDULE_OFFSET_MINUTES: i64 = 1;

/// Maximum files in one scheduled upload
pub const MAX_SCHEDULED_FILES: usize = 50;

/// Maximum length of change notes
pub const MAX_CHANGE_NOTES_LENGTH: u64 = 5000;

// =============================================================================
// USER ROLES
// =============================================================================

/// User role identifiers
pub mod roles {
    pub const FOUNDER: &str = "founder";
    pub const ADMIN: &str = "admin";
    pub const SUPPORT: &str = "support";
    pub const MEMBER: &str = "member";

    /// All user roles
    pub const ALL: &[&str] = &[FOUNDER, ADMIN, SUPPORT, MEMBER];

    /// Roles allowed to perform moderation actions
    pub const MODERATORS: &[&str] = &[FOUNDER, ADMIN];
}

// =============================================================================
// API PATHS
// =============================================================================

/// API base path
pub const API_BASE_PATH: &str = "/api/v1";

/// Where the route guard sends banned or suspended users
pub const BAN_NOTICE_PATH: &str = "/api/v1/moderation/ban-notice";

// =============================================================================
// MODERATION
// =============================================================================

/// Maximum length of a moderation reason
pub const MAX_REASON_LENGTH: u64 = 1000;

/// Maximum suspension length in hours (one year)
pub const MAX_SUSPENSION_HOURS: i64 = 24 * 365;
