//! lk-api - user account service
//!
//! A small account service (signup, login, profile read, update, delete)
//! whose repository reads go through an in-memory TTL cache.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and the `UserRepository` port
//! - **Service Layer** (`services`): account use cases
//! - **Adapters** (`adapters`): SQLite store, cache decorator, HTTP API
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lk_api::adapters::cache::CachedUserRepository;
//! use lk_api::adapters::sqlite::{initialize_database, SqliteUserRepository};
//! use lk_api::domain::models::CacheConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = initialize_database("sqlite:data/lk-api.db", None).await?;
//!     let store = Arc::new(SqliteUserRepository::new(pool));
//!     let users = CachedUserRepository::new(store, CacheConfig::default())?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::cache::{CacheStats, CacheStore, CachedUserRepository};
pub use adapters::sqlite::SqliteUserRepository;
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{CacheConfig, Config, DatabaseConfig, LoggingConfig, ServerConfig, UpdateUserRequest, User};
pub use domain::ports::UserRepository;
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::UserService;
