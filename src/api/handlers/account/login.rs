//! Login, authorization, refresh, and logout endpoints.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use super::store::SessionData;
use super::types::{
    AuthenticateRequest, AuthenticateResponse, AuthorizeRequest, ErrorResponse, LoginResponse,
    LogoutRequest, RefreshTokenRequest,
};
use super::utils::{missing_payload, normalize_email, valid_email, validation_error};
use super::AppEngine;

/// First login step: password check, answered with a temporary MFA token.
#[utoipa::path(
    post,
    path = "/account/authenticate",
    request_body = AuthenticateRequest,
    responses(
        (status = 200, description = "Password accepted, temporary token issued", body = AuthenticateResponse),
        (status = 400, description = "Invalid credentials or suspended account", body = ErrorResponse),
        (status = 401, description = "Account is not active", body = ErrorResponse)
    ),
    tag = "account"
)]
pub async fn authenticate(
    engine: Extension<Arc<AppEngine>>,
    payload: Option<Json<AuthenticateRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return missing_payload();
    };

    let email = normalize_email(&request.email);
    if email.is_empty() {
        return validation_error("MISSING_EMAIL", "Missing email");
    }
    if request.password.trim().is_empty() {
        return validation_error("MISSING_PASSWORD", "Missing password");
    }
    if !valid_email(&email) {
        return validation_error("EMAIL_NOT_IN_CORRECT_FORMAT", "Email is not valid");
    }

    match engine.authenticate(&email, &request.password).await {
        Ok(token) => (StatusCode::OK, Json(AuthenticateResponse { token })).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Second login step: exchange the temporary token for a session.
#[utoipa::path(
    post,
    path = "/account/authorize",
    request_body = AuthorizeRequest,
    responses(
        (status = 200, description = "Session created", body = LoginResponse),
        (status = 400, description = "Unknown temporary token", body = ErrorResponse),
        (status = 401, description = "Token expired or account not active", body = ErrorResponse)
    ),
    tag = "account"
)]
pub async fn authorize(
    engine: Extension<Arc<AppEngine>>,
    payload: Option<Json<AuthorizeRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return missing_payload();
    };

    let token = request.token.trim();
    if token.is_empty() {
        return validation_error("MISSING_TOKEN", "Missing token");
    }

    match engine.authorize(token).await {
        Ok(grant) => (StatusCode::OK, Json(LoginResponse::from(grant))).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Rotate a refresh token for a fresh session and access/refresh pair.
#[utoipa::path(
    post,
    path = "/account/refresh-token",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Tokens rotated", body = LoginResponse),
        (status = 400, description = "Unknown refresh token", body = ErrorResponse),
        (status = 401, description = "Refresh token expired", body = ErrorResponse)
    ),
    tag = "account"
)]
pub async fn refresh_token(
    engine: Extension<Arc<AppEngine>>,
    payload: Option<Json<RefreshTokenRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return missing_payload();
    };

    let token = request.token.trim();
    if token.is_empty() {
        return validation_error("MISSING_TOKEN", "Missing token");
    }

    match engine.refresh(token).await {
        Ok(grant) => (StatusCode::OK, Json(LoginResponse::from(grant))).into_response(),
        Err(err) => err.into_response(),
    }
}

/// End the caller's session and invalidate the presented refresh token.
#[utoipa::path(
    post,
    path = "/account/logout",
    request_body = LogoutRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Logged out"),
        (status = 400, description = "Unknown refresh token", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token")
    ),
    tag = "account"
)]
pub async fn logout(
    engine: Extension<Arc<AppEngine>>,
    session: Extension<SessionData>,
    payload: Option<Json<LogoutRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return missing_payload();
    };

    let token = request.token.trim();
    if token.is_empty() {
        return validation_error("MISSING_TOKEN", "Missing token");
    }

    match engine.logout(token, &session.session_key).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => err.into_response(),
    }
}
