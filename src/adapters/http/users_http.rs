//! Users HTTP server.
//!
//! Exposes the account use cases under `/user`: signup, login, profile read,
//! partial update and delete, plus a `/health` check.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::models::{LoginRequest, ServerConfig, SignupRequest, UpdateUserRequest};
use crate::domain::ports::UserRepository;
use crate::services::UserService;

/// Request body for a partial user update. The identifier comes from the path.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserBody {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
}

impl UpdateUserBody {
    fn into_request(self, id: Uuid) -> UpdateUserRequest {
        UpdateUserRequest {
            id,
            login: self.login,
            password: self.password,
            name: self.name,
            age: self.age,
        }
    }
}

/// Response carrying a user identifier.
#[derive(Debug, Serialize, Deserialize)]
pub struct IdResponse {
    pub id: Uuid,
}

/// Public profile of a user.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub name: String,
    pub age: u32,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.to_string(),
        }),
    )
}

impl From<DomainError> for ErrorResponse {
    fn from(err: DomainError) -> Self {
        Self {
            code: error_code(&err).to_string(),
            error: err.to_string(),
        }
    }
}

const fn error_code(err: &DomainError) -> &'static str {
    match err {
        DomainError::UserNotFound(_) => "USER_NOT_FOUND",
        DomainError::LoginNotFound(_) => "LOGIN_NOT_FOUND",
        DomainError::LoginTaken(_) => "LOGIN_TAKEN",
        DomainError::InvalidCredentials => "INVALID_CREDENTIALS",
        DomainError::ValidationFailed(_) => "VALIDATION_FAILED",
        DomainError::InvalidConfiguration(_)
        | DomainError::DatabaseError(_)
        | DomainError::SerializationError(_) => "INTERNAL_ERROR",
    }
}

const fn status_for(err: &DomainError) -> StatusCode {
    match err {
        DomainError::UserNotFound(_) => StatusCode::NOT_FOUND,
        DomainError::LoginNotFound(_) | DomainError::LoginTaken(_) | DomainError::ValidationFailed(_) => {
            StatusCode::BAD_REQUEST
        }
        DomainError::InvalidCredentials => StatusCode::FORBIDDEN,
        DomainError::InvalidConfiguration(_)
        | DomainError::DatabaseError(_)
        | DomainError::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn domain_error(err: DomainError) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }
    (status, Json(ErrorResponse::from(err)))
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, "INVALID_ID", format!("Incorrect user id: {e}")))
}

/// Users HTTP Server.
pub struct UsersHttpServer<R: UserRepository + 'static> {
    config: ServerConfig,
    service: Arc<UserService<R>>,
}

impl<R: UserRepository + 'static> UsersHttpServer<R> {
    pub fn new(service: Arc<UserService<R>>, config: ServerConfig) -> Self {
        Self { config, service }
    }

    /// Build the router.
    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.service))
    }

    /// Start the server, stopping gracefully when `shutdown` resolves.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        tracing::info!("Users HTTP server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
    }
}

/// Build the `/user` router over a shared service.
pub fn build_router<R: UserRepository + 'static>(service: Arc<UserService<R>>) -> Router {
    Router::new()
        .route("/user/signup", post(signup::<R>))
        .route("/user/login", post(login::<R>))
        .route("/user/{id}", get(get_user::<R>).put(update_user::<R>).delete(delete_user::<R>))
        .route("/health", get(health_check))
        .with_state(service)
        .layer(TraceLayer::new_for_http())
}

// Handler functions

async fn health_check() -> &'static str {
    "OK"
}

async fn signup<R: UserRepository + 'static>(
    State(service): State<Arc<UserService<R>>>,
    Json(req): Json<SignupRequest>,
) -> Result<Json<IdResponse>, ApiError> {
    let id = service.signup(req).await.map_err(domain_error)?;
    Ok(Json(IdResponse { id }))
}

async fn login<R: UserRepository + 'static>(
    State(service): State<Arc<UserService<R>>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<IdResponse>, ApiError> {
    let id = service.login(req).await.map_err(domain_error)?;
    Ok(Json(IdResponse { id }))
}

async fn get_user<R: UserRepository + 'static>(
    State(service): State<Arc<UserService<R>>>,
    Path(id): Path<String>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let id = parse_id(&id)?;
    let user = service.get_user(id).await.map_err(domain_error)?;
    Ok(Json(ProfileResponse {
        name: user.name,
        age: user.age,
    }))
}

async fn update_user<R: UserRepository + 'static>(
    State(service): State<Arc<UserService<R>>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserBody>,
) -> Result<Json<IdResponse>, ApiError> {
    let id = parse_id(&id)?;
    let id = service
        .update_user(body.into_request(id))
        .await
        .map_err(domain_error)?;
    Ok(Json(IdResponse { id }))
}

async fn delete_user<R: UserRepository + 'static>(
    State(service): State<Arc<UserService<R>>>,
    Path(id): Path<String>,
) -> Result<Json<IdResponse>, ApiError> {
    let id = parse_id(&id)?;
    service.delete_user(id).await.map_err(domain_error)?;
    Ok(Json(IdResponse { id }))
}
