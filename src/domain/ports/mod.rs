//! Port trait definitions (Hexagonal Architecture)
//!
//! - UserRepository: persistence of user accounts
//!
//! The SQLite adapter and the caching decorator both implement
//! `UserRepository`, so either can sit behind the user service.

pub mod user_repository;

pub use user_repository::UserRepository;
