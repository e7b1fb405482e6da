//! Authenticated profile endpoints: me, change-password, and admin
//! activation.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use super::store::SessionData;
use super::types::{
    ActivateUserRequest, ChangePasswordRequest, ErrorResponse, ProfileResponse,
};
use super::utils::{missing_payload, validation_error};
use super::AppEngine;

/// Profile of the authenticated user.
#[utoipa::path(
    get,
    path = "/account/me",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current profile", body = ProfileResponse),
        (status = 401, description = "Missing or invalid bearer token")
    ),
    tag = "account"
)]
pub async fn me(
    engine: Extension<Arc<AppEngine>>,
    session: Extension<SessionData>,
) -> impl IntoResponse {
    match engine.profile(session.user_id).await {
        Ok(user) => (
            StatusCode::OK,
            Json(ProfileResponse {
                id: user.id,
                name: user.name,
                email: user.email,
                role: user.role,
                active: user.active,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

/// Change the caller's password after re-verifying the current one.
#[utoipa::path(
    post,
    path = "/account/change-password",
    request_body = ChangePasswordRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Current password does not match", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token")
    ),
    tag = "account"
)]
pub async fn change_password(
    engine: Extension<Arc<AppEngine>>,
    session: Extension<SessionData>,
    payload: Option<Json<ChangePasswordRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return missing_payload();
    };

    if request.current_password.trim().is_empty() || request.new_password.trim().is_empty() {
        return validation_error("MISSING_PASSWORD", "Missing password");
    }

    match engine
        .change_password(
            session.user_id,
            &request.current_password,
            &request.new_password,
        )
        .await
    {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => err.into_response(),
    }
}

/// Activate or deactivate a user (admin only).
#[utoipa::path(
    post,
    path = "/account/activate",
    request_body = ActivateUserRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Active flag updated"),
        (status = 400, description = "Admins cannot deactivate themselves", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 403, description = "Caller is not an admin")
    ),
    tag = "account"
)]
pub async fn activate_user(
    engine: Extension<Arc<AppEngine>>,
    session: Extension<SessionData>,
    payload: Option<Json<ActivateUserRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return missing_payload();
    };

    // Admins lock themselves out otherwise.
    if request.user_id == session.user_id {
        return validation_error(
            "UNABLE_TO_DEACTIVATE_SELF",
            "Admins cannot change their own active flag",
        );
    }

    match engine.set_user_active(request.user_id, request.active).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => err.into_response(),
    }
}
