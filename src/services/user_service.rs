//! User service implementing the account use cases.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{LoginRequest, SignupRequest, UpdateUserRequest, User};
use crate::domain::ports::UserRepository;

pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Register a new account and return its identifier.
    pub async fn signup(&self, request: SignupRequest) -> DomainResult<Uuid> {
        let login = required("login", &request.login)?;
        let password = required("password", &request.password)?;
        let name = required("name", &request.name)?;

        if self.login_exists(&login).await? {
            return Err(DomainError::LoginTaken(login));
        }

        let user = User::new(login, password, name).with_age(request.age);
        self.repository.add_user(&user).await?;

        tracing::info!(user_id = %user.id, login = %user.login, "user signed up");
        Ok(user.id)
    }

    /// Check credentials and return the account identifier.
    ///
    /// An unknown login surfaces as `LoginNotFound`; a wrong password as
    /// `InvalidCredentials`.
    pub async fn login(&self, request: LoginRequest) -> DomainResult<Uuid> {
        let login = request.login.trim();

        let id = self.repository.get_user_id_by_login(login).await?;
        let user = self.repository.get_user(id).await?;
        if user.password != request.password {
            tracing::debug!(user_id = %id, "rejected login with wrong password");
            return Err(DomainError::InvalidCredentials);
        }

        Ok(id)
    }

    pub async fn get_user(&self, id: Uuid) -> DomainResult<User> {
        self.repository.get_user(id).await
    }

    /// Apply a partial update. Provided text fields must not be blank.
    pub async fn update_user(&self, mut request: UpdateUserRequest) -> DomainResult<Uuid> {
        request.login = request.login.map(|v| required("login", &v)).transpose()?;
        request.password = request.password.map(|v| required("password", &v)).transpose()?;
        request.name = request.name.map(|v| required("name", &v)).transpose()?;

        let id = self.repository.update_user(&request).await?;
        tracing::info!(user_id = %id, "user updated");
        Ok(id)
    }

    pub async fn delete_user(&self, id: Uuid) -> DomainResult<()> {
        self.repository.delete_user(id).await?;
        tracing::info!(user_id = %id, "user deleted");
        Ok(())
    }

    /// Whether an account with this login exists.
    pub async fn login_exists(&self, login: &str) -> DomainResult<bool> {
        match self.repository.get_user_id_by_login(login).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

fn required(field: &str, value: &str) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::ValidationFailed(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}
