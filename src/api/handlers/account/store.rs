//! Store contracts and records for users, login tokens, and sessions.
//!
//! `CredentialStore` owns the durable side (users, failed-login counters,
//! login tokens, password-reset tokens); `SessionStore` owns the ephemeral
//! side (session blobs with a TTL). The engine only talks to these contracts,
//! so tests can swap in in-memory implementations.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of user roles with stable wire names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }

    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "USER" => Some(Self::User),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of single-use login-token kinds.
///
/// Wire names match the values persisted in the `login_tokens.kind` column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Mfa,
    Refresh,
}

impl TokenKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mfa => "MFA",
            Self::Refresh => "REFRESH_TOKEN",
        }
    }
}

/// Durable identity record. Never deleted by the engine.
#[derive(Clone, Debug)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub role_id: i64,
    pub active: bool,
    pub failed_login_count: i32,
    pub login_blocked_until: Option<DateTime<Utc>>,
}

/// Single-use opaque login token (MFA or refresh).
///
/// `expired` is computed by the store at lookup time so the engine never
/// compares raw expiry instants against its own clock for these rows.
#[derive(Clone, Debug)]
pub struct LoginToken {
    pub id: i64,
    pub user_id: Uuid,
    pub kind: TokenKind,
    pub expired: bool,
}

/// Password-reset token with an absolute expiry instant.
#[derive(Clone, Debug)]
pub struct PasswordResetToken {
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Snapshot stored in the session store and attached to authorized requests.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub user_id: Uuid,
    pub email: String,
    pub active: bool,
    pub role: Role,
    pub role_id: i64,
    pub session_key: String,
}

/// Build the session-store key for a `(user, session)` pair.
#[must_use]
pub fn session_key(user_id: Uuid, session_id: &str) -> String {
    format!("session:{user_id}:{session_id}")
}

/// Durable credential storage contract.
///
/// Every lookup distinguishes "not found" (`Ok(None)`) from an I/O failure.
#[allow(async_fn_in_trait)]
pub trait CredentialStore: Send + Sync {
    async fn user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Resolve a login token to its owner in one lookup.
    async fn user_by_login_token(
        &self,
        token: &str,
        kind: TokenKind,
    ) -> Result<Option<(User, LoginToken)>>;

    async fn add_login_token(
        &self,
        user_id: Uuid,
        token: &str,
        kind: TokenKind,
        ttl_minutes: i64,
    ) -> Result<()>;

    async fn login_token(&self, token: &str, kind: TokenKind) -> Result<Option<LoginToken>>;

    async fn delete_login_token(&self, id: i64) -> Result<()>;

    /// Atomically increment the failure counter and, on crossing
    /// `max_failures`, set the lockout instant to `now + ban_minutes`.
    /// Returns the new counter value.
    async fn record_failed_login(
        &self,
        user_id: Uuid,
        ban_minutes: i64,
        max_failures: i32,
    ) -> Result<i32>;

    async fn reset_failed_logins(&self, user_id: Uuid) -> Result<()>;

    async fn add_password_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordResetToken>;

    async fn password_reset_token(&self, token: &str) -> Result<Option<PasswordResetToken>>;

    /// Persist the new hash and consume the reset token in one atomic store
    /// operation. Returns the refreshed user, or `None` when the token was
    /// already consumed.
    async fn set_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
        reset_token: &str,
    ) -> Result<Option<User>>;

    async fn set_new_password(&self, user_id: Uuid, password_hash: &str) -> Result<()>;

    /// Toggle the active flag. Returns false when no row was updated.
    async fn set_user_active(&self, user_id: Uuid, active: bool) -> Result<bool>;
}

/// Ephemeral session storage contract (TTL-bounded key-value store).
#[allow(async_fn_in_trait)]
pub trait SessionStore: Send + Sync {
    async fn set_session(
        &self,
        user_id: Uuid,
        session_id: &str,
        data: &SessionData,
        ttl_seconds: i64,
    ) -> Result<()>;

    async fn session(&self, user_id: Uuid, session_id: &str) -> Result<Option<SessionData>>;

    async fn delete_session(&self, user_id: Uuid, session_id: &str) -> Result<()>;

    async fn delete_session_by_key(&self, key: &str) -> Result<()>;
}
