//! Request/response types for account endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::engine::SessionGrant;
use super::store::Role;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AuthenticateRequest {
    pub email: String,
    pub password: String,
}

/// Carries the temporary MFA token bridging password check and authorization.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AuthenticateResponse {
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AuthorizeRequest {
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RefreshTokenRequest {
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LogoutRequest {
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ActivateUserRequest {
    pub user_id: Uuid,
    pub active: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
}

/// Session tuple returned by authorize, refresh, and set-password.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: TokenPair,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub user_id: Uuid,
}

impl From<SessionGrant> for LoginResponse {
    fn from(grant: SessionGrant) -> Self {
        Self {
            token: TokenPair {
                token: grant.access_token,
                refresh_token: grant.refresh_token,
            },
            name: grant.user.name,
            email: grant.user.email,
            role: grant.user.role,
            user_id: grant.user.id,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::account::store::User;

    #[test]
    fn login_response_uses_camel_case_keys() {
        let grant = SessionGrant {
            access_token: "signed".to_string(),
            refresh_token: "opaque".to_string(),
            user: User {
                id: Uuid::nil(),
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::User,
                role_id: 1,
                active: true,
                failed_login_count: 0,
                login_blocked_until: None,
            },
        };

        let value = serde_json::to_value(LoginResponse::from(grant)).expect("serialize");
        assert_eq!(value["token"]["refreshToken"], "opaque");
        assert_eq!(value["userId"], Uuid::nil().to_string());
        assert_eq!(value["role"], "USER");
    }

    #[test]
    fn change_password_request_round_trips() {
        let value = serde_json::json!({
            "currentPassword": "old",
            "newPassword": "new",
        });
        let decoded: ChangePasswordRequest = serde_json::from_value(value).expect("deserialize");
        assert_eq!(decoded.current_password, "old");
        assert_eq!(decoded.new_password, "new");
    }
}
