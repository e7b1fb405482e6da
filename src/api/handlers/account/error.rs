//! Engine error taxonomy and its client-facing mapping.
//!
//! Validation-shaped failures carry a stable error code and a 4xx status.
//! Store and signing failures map to a generic internal error; their causes
//! are logged server-side and never echoed to clients.

use axum::{http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::error;

use super::types::ErrorResponse;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email and wrong password are deliberately indistinguishable.
    #[error("incorrect email or password")]
    IncorrectCredentials,

    #[error("user is not active")]
    UserNotActive,

    #[error("user is suspended until {until}")]
    UserSuspended { until: DateTime<Utc> },

    #[error("token not found")]
    TokenNotFound,

    #[error("token expired or not valid")]
    TokenExpired,

    #[error("email does not exist")]
    EmailNotFound,

    #[error("current password does not match")]
    CurrentPasswordMismatch,

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// Stable machine-readable code returned to clients.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::IncorrectCredentials => "INCORRECT_EMAIL_OR_PASSWORD",
            Self::UserNotActive => "USER_NOT_ACTIVE",
            Self::UserSuspended { .. } => "USER_SUSPENDED",
            Self::TokenNotFound => "TOKEN_NOT_FOUND",
            Self::TokenExpired => "TOKEN_EXPIRED_OR_NOT_VALID",
            Self::EmailNotFound => "EMAIL_DOES_NOT_EXIST",
            Self::CurrentPasswordMismatch => "CURRENT_PASSWORD_MISMATCH",
            Self::Signing(_) | Self::Store(_) => "INTERNAL_ERROR",
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::IncorrectCredentials
            | Self::UserSuspended { .. }
            | Self::TokenNotFound
            | Self::EmailNotFound
            | Self::CurrentPasswordMismatch => StatusCode::BAD_REQUEST,
            Self::UserNotActive | Self::TokenExpired => StatusCode::UNAUTHORIZED,
            Self::Signing(_) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        let message = match &self {
            // Internal causes stay in the logs.
            Self::Signing(_) | Self::Store(_) => {
                error!("account operation failed: {self:#}");
                "Internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            code: self.code().to_string(),
            message,
        };
        (self.status(), Json(body)).into_response()
    }
}
