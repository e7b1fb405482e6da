//! Bearer-token authorization middleware and role gating.
//!
//! Verification failures are answered with a bare 401 and no detail; a valid
//! signature whose session record is gone gets the same answer, which is how
//! sessions revoke outstanding access tokens. Role gating is a pure
//! predicate over the session role and answers 403.

use axum::{
    extract::{Extension, Request},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use super::store::{Role, SessionData};
use super::AppEngine;

/// Resolve the bearer token into a live session and attach it to the
/// request.
pub async fn require_session(
    Extension(engine): Extension<Arc<AppEngine>>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(bearer) = bearer_token(request.headers()) else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    match engine.verify_access(&bearer).await {
        Ok(session) => {
            request.extensions_mut().insert(session);
            Ok(next.run(request).await)
        }
        Err(err) => {
            debug!("rejected bearer token: {err}");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// Restrict a route group to administrators. Must run inside
/// `require_session`.
pub async fn require_admin(
    Extension(session): Extension<SessionData>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if role_allowed(session.role, &[Role::Admin]) {
        Ok(next.run(request).await)
    } else {
        Err(StatusCode::FORBIDDEN)
    }
}

pub(crate) fn role_allowed(role: Role, allowed: &[Role]) -> bool {
    allowed.contains(&role)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Some(token.to_string()),
        _ => None,
    }
}
