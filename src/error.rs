//! Unified error model for the carehub core.
//! Every fallible operation returns `AppResult`; front ends map the variants to
//! HTTP statuses or console messages without inspecting the message text.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// Caller supplied malformed or empty data.
    #[error("{code}: {message}")]
    UserInput { code: String, message: String },
    /// Authentication failed. Unknown user and wrong secret share one value.
    #[error("{code}: {message}")]
    Auth { code: String, message: String },
    /// A stored hash string is not one this crate produced.
    #[error("{code}: {message}")]
    InvalidFormat { code: String, message: String },
    /// Backing store unreachable or the handle could not be (re)opened.
    #[error("{code}: {message}")]
    Connection { code: String, message: String },
    #[error("{code}: {message}")]
    Conflict { code: String, message: String },
    #[error("{code}: {message}")]
    NotFound { code: String, message: String },
    #[error("{code}: {message}")]
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::Auth { code, .. }
            | AppError::InvalidFormat { code, .. }
            | AppError::Connection { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::Auth { message, .. }
            | AppError::InvalidFormat { message, .. }
            | AppError::Connection { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn auth<S: Into<String>>(code: S, msg: S) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn format<S: Into<String>>(code: S, msg: S) -> Self { AppError::InvalidFormat { code: code.into(), message: msg.into() } }
    pub fn connection<S: Into<String>>(code: S, msg: S) -> Self { AppError::Connection { code: code.into(), message: msg.into() } }
    pub fn conflict<S: Into<String>>(code: S, msg: S) -> Self { AppError::Conflict { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// The one error every failed login produces, whatever the cause.
    pub fn invalid_credentials() -> Self {
        AppError::auth("invalid_credentials", "invalid username or password")
    }

    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, AppError::Auth { code, .. } if code == "invalid_credentials")
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UserInput { .. } => 400,
            AppError::Auth { .. } => 401,
            AppError::NotFound { .. } => 404,
            AppError::Conflict { .. } => 409,
            AppError::InvalidFormat { .. } => 422,
            AppError::Connection { .. } => 503,
            AppError::Internal { .. } => 500,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl From<tokio_postgres::Error> for AppError {
    fn from(err: tokio_postgres::Error) -> Self {
        AppError::connection("db_error".to_string(), err.to_string())
    }
}
