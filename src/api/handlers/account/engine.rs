//! Authentication and session lifecycle engine.
//!
//! Implements the login state machine: password check with lockout, temporary
//! MFA token, full authorization (session + access/refresh pair), refresh
//! rotation, logout, and password reset/change. The engine holds no mutable
//! state of its own; everything durable lives in the credential store and
//! everything ephemeral in the session store.

use anyhow::anyhow;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, warn};
use ulid::Ulid;
use uuid::Uuid;

use crate::api::email::{Mailer, ResetEmail};

use super::error::{AuthError, AuthResult};
use super::lockout;
use super::password;
use super::state::AccountConfig;
use super::store::{
    session_key, CredentialStore, SessionData, SessionStore, TokenKind, User,
};
use super::token::{self, TokenError};

/// Result of a successful authorization: one live session plus the
/// access/refresh pair that references it.
#[derive(Debug)]
pub struct SessionGrant {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

pub struct AuthEngine<C, S> {
    credentials: Arc<C>,
    sessions: Arc<S>,
    mailer: Mailer,
    config: AccountConfig,
}

impl<C, S> AuthEngine<C, S>
where
    C: CredentialStore,
    S: SessionStore,
{
    pub fn new(credentials: Arc<C>, sessions: Arc<S>, mailer: Mailer, config: AccountConfig) -> Self {
        Self {
            credentials,
            sessions,
            mailer,
            config,
        }
    }

    /// First login step: verify the password and hand out a short-lived MFA
    /// token. No session is created here.
    ///
    /// Unknown email and wrong password produce the same error so callers
    /// cannot probe which accounts exist.
    pub async fn authenticate(&self, email: &str, password: &str) -> AuthResult<String> {
        let Some(user) = self.credentials.user_by_email(email).await? else {
            debug!("authenticate: no account for the supplied email");
            return Err(AuthError::IncorrectCredentials);
        };

        if !user.active {
            return Err(AuthError::UserNotActive);
        }

        if let Some(until) = lockout::suspension(
            user.failed_login_count,
            user.login_blocked_until,
            self.config.max_login_failures(),
        ) {
            return Err(AuthError::UserSuspended { until });
        }

        if !password::verify_password(password, &user.password_hash)? {
            let failures = self
                .credentials
                .record_failed_login(
                    user.id,
                    self.config.ban_minutes(),
                    self.config.max_login_failures(),
                )
                .await?;
            warn!(user_id = %user.id, failures, "failed login attempt");
            return Err(AuthError::IncorrectCredentials);
        }

        let mfa_token = token::opaque_token()?;
        self.credentials
            .add_login_token(
                user.id,
                &mfa_token,
                TokenKind::Mfa,
                self.config.mfa_token_ttl_minutes(),
            )
            .await?;

        Ok(mfa_token)
    }

    /// Second login step: exchange the MFA token for a session and an
    /// access/refresh pair.
    pub async fn authorize(&self, mfa_token: &str) -> AuthResult<SessionGrant> {
        let Some((user, login_token)) = self
            .credentials
            .user_by_login_token(mfa_token, TokenKind::Mfa)
            .await?
        else {
            return Err(AuthError::IncorrectCredentials);
        };

        if login_token.expired {
            return Err(AuthError::TokenExpired);
        }

        if !user.active {
            return Err(AuthError::UserNotActive);
        }

        // MFA tokens are single-use: consume the row before anything is
        // issued, and abort if the store refuses the delete.
        self.credentials.delete_login_token(login_token.id).await?;

        if user.failed_login_count > 0 {
            self.credentials.reset_failed_logins(user.id).await?;
        }

        self.grant_session(&user).await
    }

    /// Rotate a refresh token: the presented value is invalidated before the
    /// replacement pair is issued, so at most one refresh succeeds per value.
    ///
    /// No session or lockout re-check happens here; an unbroken rotation
    /// chain proves continued authorization.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<SessionGrant> {
        let Some(login_token) = self
            .credentials
            .login_token(refresh_token, TokenKind::Refresh)
            .await?
        else {
            return Err(AuthError::TokenNotFound);
        };

        if login_token.expired {
            return Err(AuthError::TokenExpired);
        }

        // Delete-before-issue: two valid refresh tokens must never coexist
        // after a single rotation.
        self.credentials.delete_login_token(login_token.id).await?;

        let Some(user) = self.credentials.user_by_id(login_token.user_id).await? else {
            return Err(AuthError::TokenNotFound);
        };

        self.grant_session(&user).await
    }

    /// End a session. Session deletion is best-effort; failing to delete the
    /// refresh token is surfaced, since leaving one valid is a security
    /// problem the caller must hear about.
    pub async fn logout(&self, refresh_token: &str, session_key: &str) -> AuthResult<()> {
        if !session_key.is_empty() {
            if let Err(err) = self.sessions.delete_session_by_key(session_key).await {
                warn!("failed to delete session {session_key}: {err:#}");
            }
        }

        let Some(login_token) = self
            .credentials
            .login_token(refresh_token, TokenKind::Refresh)
            .await?
        else {
            return Err(AuthError::TokenNotFound);
        };

        self.credentials.delete_login_token(login_token.id).await?;
        Ok(())
    }

    /// Issue a password-reset token and queue the notification email.
    ///
    /// The mailer is fire-and-forget: a provider outage never fails this
    /// operation.
    pub async fn request_password_reset(&self, email: &str) -> AuthResult<()> {
        let Some(user) = self.credentials.user_by_email(email).await? else {
            return Err(AuthError::EmailNotFound);
        };

        if !user.active {
            return Err(AuthError::UserNotActive);
        }

        let reset_token = token::opaque_token()?;
        let expires_at = Utc::now() + Duration::minutes(self.config.reset_token_ttl_minutes());
        let reset = self
            .credentials
            .add_password_reset_token(user.id, &reset_token, expires_at)
            .await?;

        self.mailer.submit(ResetEmail {
            template_id: self.config.reset_template_id(),
            recipient: user.email,
            sender: self.config.sender_email().to_string(),
            token: reset.token,
        });

        Ok(())
    }

    /// Set a new password via a reset token and log the user straight in.
    ///
    /// Expiry is checked against the wall clock at call time; an expired
    /// token never mutates the password.
    pub async fn complete_password_reset(
        &self,
        reset_token: &str,
        new_password: &str,
    ) -> AuthResult<SessionGrant> {
        let Some(reset) = self.credentials.password_reset_token(reset_token).await? else {
            return Err(AuthError::TokenNotFound);
        };

        if reset.expires_at < Utc::now() {
            return Err(AuthError::TokenExpired);
        }

        let password_hash = password::hash_password(new_password)?;
        let Some(user) = self
            .credentials
            .set_password(reset.user_id, &password_hash, reset_token)
            .await?
        else {
            // The token was consumed between lookup and update.
            return Err(AuthError::TokenNotFound);
        };

        self.grant_session(&user).await
    }

    /// Change the password of an authenticated user.
    ///
    /// Existing sessions and refresh tokens stay valid; only the hash
    /// changes.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        let user = self
            .credentials
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::Store(anyhow!("user {user_id} not found")))?;

        if !password::verify_password(current_password, &user.password_hash)? {
            return Err(AuthError::CurrentPasswordMismatch);
        }

        let password_hash = password::hash_password(new_password)?;
        self.credentials
            .set_new_password(user_id, &password_hash)
            .await?;
        Ok(())
    }

    /// Validate a bearer token and load its session.
    ///
    /// A valid signature is not enough: the session record must still exist.
    /// Deleting the session is how access tokens get revoked before their
    /// own expiry.
    pub async fn verify_access(&self, bearer: &str) -> AuthResult<SessionData> {
        let claim = token::verify_access_token(bearer, self.config.secret()).map_err(
            |err| match err {
                TokenError::Expired => AuthError::TokenExpired,
                other => {
                    debug!("access token rejected: {other}");
                    AuthError::TokenExpired
                }
            },
        )?;

        self.sessions
            .session(claim.sub, &claim.sid)
            .await?
            .ok_or(AuthError::TokenExpired)
    }

    pub async fn profile(&self, user_id: Uuid) -> AuthResult<User> {
        self.credentials
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::Store(anyhow!("user {user_id} not found")))
    }

    pub async fn set_user_active(&self, user_id: Uuid, active: bool) -> AuthResult<()> {
        if !self.credentials.set_user_active(user_id, active).await? {
            return Err(AuthError::Store(anyhow!(
                "unable to update active flag for user {user_id}"
            )));
        }
        Ok(())
    }

    /// Create a session and issue the access/refresh pair referencing it.
    async fn grant_session(&self, user: &User) -> AuthResult<SessionGrant> {
        let session_id = Ulid::new().to_string();
        let key = session_key(user.id, &session_id);

        let data = SessionData {
            user_id: user.id,
            email: user.email.clone(),
            active: user.active,
            role: user.role,
            role_id: user.role_id,
            session_key: key,
        };
        self.sessions
            .set_session(
                user.id,
                &session_id,
                &data,
                self.config.session_ttl_seconds(),
            )
            .await?;

        let access_token = token::issue_access_token(
            user.id,
            &session_id,
            Duration::seconds(self.config.access_token_ttl_seconds()),
            self.config.secret(),
        )
        .map_err(|err| AuthError::Signing(err.to_string()))?;

        let refresh_token = token::opaque_token()?;
        self.credentials
            .add_login_token(
                user.id,
                &refresh_token,
                TokenKind::Refresh,
                self.config.refresh_token_ttl_minutes(),
            )
            .await?;

        Ok(SessionGrant {
            access_token,
            refresh_token,
            user: user.clone(),
        })
    }
}
