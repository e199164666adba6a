pub mod config;
pub mod user;

pub use config::{CacheConfig, Config, DatabaseConfig, LoggingConfig, ServerConfig};
pub use user::{LoginRequest, SignupRequest, UpdateUserRequest, User};
