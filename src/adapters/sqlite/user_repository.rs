//! SQLite implementation of the UserRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{UpdateUserRequest, User};
use crate::domain::ports::UserRepository;

#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Map a write failure, turning a unique violation on `login` into `LoginTaken`.
fn map_write_error(err: sqlx::Error, login: Option<&str>) -> DomainError {
    if let (sqlx::Error::Database(db_err), Some(login)) = (&err, login) {
        if db_err.is_unique_violation() {
            return DomainError::LoginTaken(login.to_string());
        }
    }
    err.into()
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn get_user(&self, id: Uuid) -> DomainResult<User> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, login, password, name, age, created_at, updated_at FROM users WHERE id = ?"
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(DomainError::UserNotFound(id))?.try_into()
    }

    async fn get_user_id_by_login(&self, login: &str) -> DomainResult<Uuid> {
        let row: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE login = ?")
            .bind(login)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some((id,)) => super::parse_uuid(&id),
            None => Err(DomainError::LoginNotFound(login.to_string())),
        }
    }

    async fn add_user(&self, user: &User) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO users (id, login, password, name, age, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#
        )
        .bind(user.id.to_string())
        .bind(&user.login)
        .bind(&user.password)
        .bind(&user.name)
        .bind(i64::from(user.age))
        .bind(user.created_at.to_rfc3339())
        .bind(user.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, Some(&user.login)))?;

        Ok(())
    }

    async fn update_user(&self, request: &UpdateUserRequest) -> DomainResult<Uuid> {
        if request.is_empty() {
            let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE id = ?")
                .bind(request.id.to_string())
                .fetch_optional(&self.pool)
                .await?;
            return exists.map(|_| request.id).ok_or(DomainError::UserNotFound(request.id));
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE users SET ");
        let mut fields = builder.separated(", ");
        if let Some(login) = &request.login {
            fields.push("login = ").push_bind_unseparated(login.clone());
        }
        if let Some(password) = &request.password {
            fields.push("password = ").push_bind_unseparated(password.clone());
        }
        if let Some(name) = &request.name {
            fields.push("name = ").push_bind_unseparated(name.clone());
        }
        if let Some(age) = request.age {
            fields.push("age = ").push_bind_unseparated(i64::from(age));
        }
        fields.push("updated_at = ").push_bind_unseparated(Utc::now().to_rfc3339());
        builder.push(" WHERE id = ").push_bind(request.id.to_string());

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, request.login.as_deref()))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::UserNotFound(request.id));
        }

        Ok(request.id)
    }

    async fn delete_user(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::UserNotFound(id));
        }

        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    login: String,
    password: String,
    name: String,
    age: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = DomainError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let id = super::parse_uuid(&row.id)?;
        let age = u32::try_from(row.age)
            .map_err(|_| DomainError::SerializationError(format!("Invalid age: {}", row.age)))?;

        Ok(User {
            id,
            login: row.login,
            password: row.password,
            name: row.name,
            age,
            created_at: super::parse_datetime(&row.created_at)?,
            updated_at: super::parse_datetime(&row.updated_at)?,
        })
    }
}
