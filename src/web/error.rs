use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::QueryRejection;
use thiserror::Error;
use tracing::error;

use crate::db::services::error::ServiceError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Validation failed on {field}: {message}")]
    Validation { field: String, message: String },
    #[error("User not found")]
    UserNotFound,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Password hashing failed: {0}")]
    PasswordHashingError(String),
    #[error("JWT creation failed: {0}")]
    TokenCreationError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Validation { field, message } => {
                let body = serde_json::json!({
                    "error": message.clone(),
                    "field": field.clone(),
                    "errors": { (field.as_str()): [message] },
                });
                return (StatusCode::BAD_REQUEST, Json(body)).into_response();
            }
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "User not found.".to_string()),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid credentials.".to_string(),
            ),
            AppError::PasswordHashingError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Password hashing error: {msg}"),
            ),
            AppError::TokenCreationError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Token creation error: {msg}"),
            ),
            AppError::DatabaseError(msg) => {
                error!(error = %msg, "Database error while handling request.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error.".to_string(),
                )
            }
            AppError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };
        (status, Json(serde_json::json!({ "error": error_message }))).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(v) => AppError::validation(v.field(), v.to_string()),
            ServiceError::SelfFollow => AppError::validation("author", err.to_string()),
            ServiceError::AlreadyExists(msg) | ServiceError::Conflict(msg) => {
                AppError::Conflict(msg)
            }
            ServiceError::AlreadyFollowing => AppError::Conflict(err.to_string()),
            ServiceError::NotFollowing => AppError::NotFound(err.to_string()),
            ServiceError::NotFound(msg) => AppError::NotFound(msg),
            ServiceError::Forbidden => AppError::Forbidden(err.to_string()),
            ServiceError::Unauthenticated => AppError::Unauthorized(err.to_string()),
            ServiceError::Database(e) => AppError::DatabaseError(e.to_string()),
        }
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

/// Field key used when a rejected payload cannot be pinned to one field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Field a deserialization error points at: the leading path of a nested
/// error (`ingredients[0].amount: invalid type`), else the name quoted in
/// `missing field `x`` / `unknown field `x``.
fn rejected_field(detail: &str) -> String {
    if let Some((path, _)) = detail.split_once(": ") {
        if !path.is_empty() && !path.contains(char::is_whitespace) {
            let root = path.split(['[', '.']).next().unwrap_or(path);
            if !root.is_empty() {
                return root.to_string();
            }
        }
    }
    detail
        .split_once("field `")
        .and_then(|(_, rest)| rest.split_once('`'))
        .map(|(name, _)| name.to_string())
        .unwrap_or_else(|| NON_FIELD_ERRORS.to_string())
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => {
                let body = err.body_text();
                let detail = body
                    .split_once("target type: ")
                    .map_or(body.as_str(), |(_, rest)| rest);
                AppError::validation(rejected_field(detail), detail)
            }
            other => AppError::validation(NON_FIELD_ERRORS, other.body_text()),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        let detail = rejection.to_string();
        let field = detail
            .split_once("query string: ")
            .map(|(_, rest)| rejected_field(rest))
            .unwrap_or_else(|| NON_FIELD_ERRORS.to_string());
        AppError::validation(field, detail)
    }
}
