use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// RepoError
///
/// Domain-level failures of the model repository. The remote error shape
/// (PostgREST `{code, message}`) is always translated into one of these and
/// never swallowed.
#[derive(Debug, Error, PartialEq)]
pub enum RepoError {
    /// The requested model does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A remote read failed for any other reason.
    #[error("Failed to fetch models: {0}")]
    Fetch(String),

    /// A remote write was rejected.
    #[error("Failed to create model: {0}")]
    Create(String),
}

/// AuthError
///
/// Failures raised by the auth service clients and the session sync protocol.
#[derive(Debug, Error, PartialEq)]
pub enum AuthError {
    /// The operation needs a signed-in session and there is none.
    #[error("Authentication required")]
    AuthRequired,

    /// The auth service answered with a 4xx (bad credentials, revoked refresh token...).
    #[error("Auth service rejected the request: {0}")]
    Rejected(String),

    /// The auth service could not be reached or answered with garbage.
    #[error("Auth service unavailable: {0}")]
    Transport(String),

    /// No session was confirmed before the deadline.
    #[error("No session confirmed within {0:?}")]
    SessionTimeout(Duration),
}

/// AppError
///
/// The error type returned by HTTP handlers. Unauthenticated access to a
/// protected endpoint yields a redirect to the login view, not an error page.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Path of the login view every protected endpoint redirects to.
pub const LOGIN_PATH: &str = "/login";

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::NotFound(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::AuthRequired => AppError::AuthRequired,
            AuthError::Rejected(msg) => AppError::InvalidCredentials(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::AuthRequired => return Redirect::to(LOGIN_PATH).into_response(),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InvalidCredentials(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
