//! User repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{UpdateUserRequest, User};

/// Repository interface for user persistence.
///
/// Keyed lookups report absence as an error (`UserNotFound` /
/// `LoginNotFound`) rather than `Option`, so a decorator can forward the
/// outcome of the inner store untouched.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Get a user by identifier.
    async fn get_user(&self, id: Uuid) -> DomainResult<User>;

    /// Resolve a login to the owning user's identifier.
    async fn get_user_id_by_login(&self, login: &str) -> DomainResult<Uuid>;

    /// Persist a new user. Fails with `LoginTaken` on a duplicate login.
    async fn add_user(&self, user: &User) -> DomainResult<()>;

    /// Apply a partial update, returning the identifier of the updated user.
    async fn update_user(&self, request: &UpdateUserRequest) -> DomainResult<Uuid>;

    /// Delete a user by identifier.
    async fn delete_user(&self, id: Uuid) -> DomainResult<()>;

    /// Release resources held by the repository. Safe to call more than once.
    async fn close(&self);
}
