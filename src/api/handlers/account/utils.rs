//! Small helpers shared by the account handlers.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use regex::Regex;

use super::types::ErrorResponse;

/// Normalize an email for lookup.
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email shape check on already-normalized input.
pub(super) fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}

/// 400 with a stable validation code.
pub(super) fn validation_error(code: &str, message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
        }),
    )
        .into_response()
}

pub(super) fn missing_payload() -> Response {
    validation_error("MISSING_PAYLOAD", "Missing payload")
}
