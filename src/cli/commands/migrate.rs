//! Implementation of the `lk-api migrate` command.

use anyhow::{Context, Result};
use clap::Args;

use crate::adapters::sqlite::Migrator;
use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct MigrateArgs {}

pub async fn execute(_args: MigrateArgs, config: Config) -> Result<()> {
    let pool = super::open_database(&config.database).await?;

    let version = Migrator::new(pool.clone())
        .get_current_version()
        .await
        .context("Failed to read schema version")?;
    pool.close().await;

    tracing::info!(version, path = %config.database.path, "database schema is up to date");
    println!("Database at {} is at schema version {version}", config.database.path);
    Ok(())
}
