//! CLI command implementations.

pub mod migrate;
pub mod serve;

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::adapters::sqlite::{initialize_database, verify_connection, PoolConfig};
use crate::domain::models::DatabaseConfig;

/// Open the configured database and bring its schema up to date.
async fn open_database(config: &DatabaseConfig) -> Result<SqlitePool> {
    let pool = initialize_database(&config.url(), Some(PoolConfig::from(config)))
        .await
        .with_context(|| format!("Failed to initialize database at {}", config.path))?;

    verify_connection(&pool).await.context("Database connection check failed")?;
    tracing::debug!(path = %config.path, "database ready");
    Ok(pool)
}
