//! Password-reset endpoints.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use super::types::{ErrorResponse, ForgotPasswordRequest, LoginResponse, SetPasswordRequest};
use super::utils::{missing_payload, normalize_email, valid_email, validation_error};
use super::AppEngine;

/// Issue a reset token and queue the notification email.
///
/// The response does not wait for (or depend on) email delivery.
#[utoipa::path(
    post,
    path = "/account/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 204, description = "Reset token issued and email queued"),
        (status = 400, description = "Unknown email", body = ErrorResponse),
        (status = 401, description = "Account is not active", body = ErrorResponse)
    ),
    tag = "account"
)]
pub async fn forgot_password(
    engine: Extension<Arc<AppEngine>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return missing_payload();
    };

    let email = normalize_email(&request.email);
    if email.is_empty() {
        return validation_error("MISSING_EMAIL", "Missing email");
    }
    if !valid_email(&email) {
        return validation_error("EMAIL_NOT_IN_CORRECT_FORMAT", "Email is not valid");
    }

    match engine.request_password_reset(&email).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

/// Set a new password via a reset token; success is an implicit login.
#[utoipa::path(
    post,
    path = "/account/set-password",
    request_body = SetPasswordRequest,
    responses(
        (status = 200, description = "Password set, session created", body = LoginResponse),
        (status = 400, description = "Unknown reset token", body = ErrorResponse),
        (status = 401, description = "Reset token expired", body = ErrorResponse)
    ),
    tag = "account"
)]
pub async fn set_password(
    engine: Extension<Arc<AppEngine>>,
    payload: Option<Json<SetPasswordRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return missing_payload();
    };

    let token = request.token.trim();
    if token.is_empty() {
        return validation_error("MISSING_TOKEN", "Missing token");
    }
    if request.password.trim().is_empty() {
        return validation_error("MISSING_PASSWORD", "Missing password");
    }

    match engine.complete_password_reset(token, &request.password).await {
        Ok(grant) => (StatusCode::OK, Json(LoginResponse::from(grant))).into_response(),
        Err(err) => err.into_response(),
    }
}
