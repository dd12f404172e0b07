//! Database connection management

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::{ConfigError, DatabaseConfig};

/// Create a new database connection pool
pub async fn create_pool(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let url = config
        .url
        .as_deref()
        .ok_or_else(|| ConfigError::Missing("DATABASE_URL".to_string()))?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(url)
        .await?;

    Ok(pool)
}

