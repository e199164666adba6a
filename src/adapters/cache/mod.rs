//! In-memory caching layer for user reads.
//!
//! A dual-index store (by id and by login) with last-access expiry, a
//! background janitor that sweeps idle entries, and a decorator that puts
//! both in front of any `UserRepository`.

pub mod cached_user_repository;
pub mod janitor;
pub mod store;

pub use cached_user_repository::CachedUserRepository;
pub use janitor::{Janitor, JanitorStatus};
pub use store::{CacheStats, CacheStore};
