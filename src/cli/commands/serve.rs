//! Implementation of the `lk-api serve` command.

use anyhow::{Context, Result};
use clap::Args;
use std::sync::Arc;

use crate::adapters::cache::CachedUserRepository;
use crate::adapters::http::UsersHttpServer;
use crate::adapters::sqlite::SqliteUserRepository;
use crate::domain::models::Config;
use crate::domain::ports::UserRepository;
use crate::services::UserService;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on (overrides server.port)
    #[arg(short, long)]
    pub port: Option<u16>,
}

pub async fn execute(args: ServeArgs, mut config: Config) -> Result<()> {
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let pool = super::open_database(&config.database).await?;
    let store = Arc::new(SqliteUserRepository::new(pool));
    let repository = Arc::new(
        CachedUserRepository::new(store, config.cache.clone()).context("Failed to start the user cache")?,
    );

    let service = Arc::new(UserService::new(Arc::clone(&repository)));
    let server = UsersHttpServer::new(service, config.server.clone());

    let result = server.serve_with_shutdown(shutdown_signal()).await;

    repository.close().await;
    tracing::info!("server stopped");

    result.with_context(|| format!("HTTP server on {}:{} failed", config.server.host, config.server.port))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "failed to listen for shutdown signal"),
    }
}
