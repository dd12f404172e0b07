//! Database repositories
//!
//! Postgres implementations of the store traits. Each file implements one
//! trait for [`PgStore`].

pub mod audit_repo;
pub mod scheduled_upload_repo;
pub mod user_repo;
pub mod warning_repo;

use sqlx::PgPool;

/// Store backed by a Postgres connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the database pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
