//! Engine tests over in-memory stores.
//!
//! These cover the lifecycle properties: lockout thresholds, counter resets,
//! single-use MFA and refresh tokens, reset-token expiry, and session
//! revocation.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::api::email::{spawn_mailer, EmailSender, Mailer, ResetEmail};

use super::engine::AuthEngine;
use super::error::AuthError;
use super::password;
use super::state::AccountConfig;
use super::store::{
    session_key, CredentialStore, LoginToken, PasswordResetToken, Role, SessionData, SessionStore,
    TokenKind, User,
};

const MAX_FAILURES: i32 = 3;

#[derive(Clone)]
struct StoredLoginToken {
    id: i64,
    user_id: Uuid,
    token: String,
    kind: TokenKind,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
struct StoredResetToken {
    user_id: Uuid,
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct MemCredentialStore {
    users: Mutex<Vec<User>>,
    login_tokens: Mutex<Vec<StoredLoginToken>>,
    reset_tokens: Mutex<Vec<StoredResetToken>>,
    next_token_id: AtomicI64,
}

impl MemCredentialStore {
    fn add_user(&self, email: &str, password: &str, active: bool) -> User {
        let user = User {
            id: Uuid::new_v4(),
            name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: password::hash_password(password).expect("hash"),
            role: Role::User,
            role_id: 1,
            active,
            failed_login_count: 0,
            login_blocked_until: None,
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }

    fn insert_login_token(&self, user_id: Uuid, token: &str, kind: TokenKind, expires_at: DateTime<Utc>) {
        let id = self.next_token_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.login_tokens.lock().unwrap().push(StoredLoginToken {
            id,
            user_id,
            token: token.to_string(),
            kind,
            expires_at,
        });
    }

    fn insert_reset_token(&self, user_id: Uuid, token: &str, expires_at: DateTime<Utc>) {
        self.reset_tokens.lock().unwrap().push(StoredResetToken {
            user_id,
            token: token.to_string(),
            expires_at,
        });
    }

    fn failed_count(&self, user_id: Uuid) -> i32 {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.id == user_id)
            .map(|user| user.failed_login_count)
            .unwrap_or_default()
    }

    fn password_hash(&self, user_id: Uuid) -> String {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.id == user_id)
            .map(|user| user.password_hash.clone())
            .unwrap_or_default()
    }

    fn login_token_count(&self, kind: TokenKind) -> usize {
        self.login_tokens
            .lock()
            .unwrap()
            .iter()
            .filter(|token| token.kind == kind)
            .count()
    }

    fn reset_token_value(&self) -> Option<String> {
        self.reset_tokens
            .lock()
            .unwrap()
            .first()
            .map(|token| token.token.clone())
    }
}

impl CredentialStore for MemCredentialStore {
    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.id == id)
            .cloned())
    }

    async fn user_by_login_token(
        &self,
        token: &str,
        kind: TokenKind,
    ) -> Result<Option<(User, LoginToken)>> {
        let tokens = self.login_tokens.lock().unwrap();
        let Some(stored) = tokens
            .iter()
            .find(|stored| stored.token == token && stored.kind == kind)
            .cloned()
        else {
            return Ok(None);
        };
        drop(tokens);

        let user = self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.id == stored.user_id)
            .cloned()
            .ok_or_else(|| anyhow!("token owner missing"))?;

        Ok(Some((
            user,
            LoginToken {
                id: stored.id,
                user_id: stored.user_id,
                kind,
                expired: stored.expires_at < Utc::now(),
            },
        )))
    }

    async fn add_login_token(
        &self,
        user_id: Uuid,
        token: &str,
        kind: TokenKind,
        ttl_minutes: i64,
    ) -> Result<()> {
        self.insert_login_token(user_id, token, kind, Utc::now() + Duration::minutes(ttl_minutes));
        Ok(())
    }

    async fn login_token(&self, token: &str, kind: TokenKind) -> Result<Option<LoginToken>> {
        Ok(self
            .login_tokens
            .lock()
            .unwrap()
            .iter()
            .find(|stored| stored.token == token && stored.kind == kind)
            .map(|stored| LoginToken {
                id: stored.id,
                user_id: stored.user_id,
                kind,
                expired: stored.expires_at < Utc::now(),
            }))
    }

    async fn delete_login_token(&self, id: i64) -> Result<()> {
        let mut tokens = self.login_tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|stored| stored.id != id);
        if tokens.len() == before {
            return Err(anyhow!("login token {id} was already deleted"));
        }
        Ok(())
    }

    async fn record_failed_login(
        &self,
        user_id: Uuid,
        ban_minutes: i64,
        max_failures: i32,
    ) -> Result<i32> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|user| user.id == user_id)
            .ok_or_else(|| anyhow!("user not found"))?;

        user.failed_login_count += 1;
        if user.failed_login_count >= max_failures {
            user.login_blocked_until = Some(Utc::now() + Duration::minutes(ban_minutes));
        }
        Ok(user.failed_login_count)
    }

    async fn reset_failed_logins(&self, user_id: Uuid) -> Result<()> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|user| user.id == user_id) {
            user.failed_login_count = 0;
            user.login_blocked_until = None;
        }
        Ok(())
    }

    async fn add_password_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordResetToken> {
        self.insert_reset_token(user_id, token, expires_at);
        Ok(PasswordResetToken {
            user_id,
            token: token.to_string(),
            expires_at,
        })
    }

    async fn password_reset_token(&self, token: &str) -> Result<Option<PasswordResetToken>> {
        Ok(self
            .reset_tokens
            .lock()
            .unwrap()
            .iter()
            .find(|stored| stored.token == token)
            .map(|stored| PasswordResetToken {
                user_id: stored.user_id,
                token: stored.token.clone(),
                expires_at: stored.expires_at,
            }))
    }

    async fn set_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
        reset_token: &str,
    ) -> Result<Option<User>> {
        let mut tokens = self.reset_tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|stored| !(stored.token == reset_token && stored.user_id == user_id));
        if tokens.len() == before {
            return Ok(None);
        }
        drop(tokens);

        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|user| user.id == user_id)
            .ok_or_else(|| anyhow!("user not found"))?;
        user.password_hash = password_hash.to_string();
        Ok(Some(user.clone()))
    }

    async fn set_new_password(&self, user_id: Uuid, password_hash: &str) -> Result<()> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|user| user.id == user_id)
            .ok_or_else(|| anyhow!("user not found"))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn set_user_active(&self, user_id: Uuid, active: bool) -> Result<bool> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|user| user.id == user_id) {
            Some(user) => {
                user.active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
struct MemSessionStore {
    sessions: Mutex<HashMap<String, SessionData>>,
}

impl SessionStore for MemSessionStore {
    async fn set_session(
        &self,
        user_id: Uuid,
        session_id: &str,
        data: &SessionData,
        _ttl_seconds: i64,
    ) -> Result<()> {
        self.sessions
            .lock()
            .unwrap()
            .insert(session_key(user_id, session_id), data.clone());
        Ok(())
    }

    async fn session(&self, user_id: Uuid, session_id: &str) -> Result<Option<SessionData>> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(&session_key(user_id, session_id))
            .cloned())
    }

    async fn delete_session(&self, user_id: Uuid, session_id: &str) -> Result<()> {
        self.delete_session_by_key(&session_key(user_id, session_id))
            .await
    }

    async fn delete_session_by_key(&self, key: &str) -> Result<()> {
        self.sessions.lock().unwrap().remove(key);
        Ok(())
    }
}

struct FailingSender;

impl EmailSender for FailingSender {
    fn send(&self, _message: &ResetEmail) -> Result<()> {
        Err(anyhow!("provider unavailable"))
    }
}

struct Fixture {
    engine: AuthEngine<MemCredentialStore, MemSessionStore>,
    credentials: Arc<MemCredentialStore>,
    sessions: Arc<MemSessionStore>,
}

fn fixture_with_mailer(mailer: Mailer) -> Fixture {
    let credentials = Arc::new(MemCredentialStore::default());
    let sessions = Arc::new(MemSessionStore::default());
    let config = AccountConfig::new(
        SecretString::from("engine-test-secret".to_string()),
        "no-reply@pordisto.dev".to_string(),
    )
    .with_max_login_failures(MAX_FAILURES)
    .with_ban_minutes(5);

    Fixture {
        engine: AuthEngine::new(
            Arc::clone(&credentials),
            Arc::clone(&sessions),
            mailer,
            config,
        ),
        credentials,
        sessions,
    }
}

fn fixture() -> Fixture {
    fixture_with_mailer(spawn_mailer(Arc::new(crate::api::email::LogEmailSender)))
}

#[tokio::test]
async fn authenticate_unknown_email_is_anonymous() {
    let fixture = fixture();
    let result = fixture.engine.authenticate("ghost@example.com", "pw").await;
    assert!(matches!(result, Err(AuthError::IncorrectCredentials)));
}

#[tokio::test]
async fn authenticate_inactive_user_is_rejected() {
    let fixture = fixture();
    fixture.credentials.add_user("a@x.com", "pw", false);
    let result = fixture.engine.authenticate("a@x.com", "pw").await;
    assert!(matches!(result, Err(AuthError::UserNotActive)));
}

#[tokio::test]
async fn wrong_password_increments_the_counter() {
    let fixture = fixture();
    let user = fixture.credentials.add_user("a@x.com", "right", true);

    let result = fixture.engine.authenticate("a@x.com", "wrong").await;
    assert!(matches!(result, Err(AuthError::IncorrectCredentials)));
    assert_eq!(fixture.credentials.failed_count(user.id), 1);
}

#[tokio::test]
async fn lockout_holds_even_with_the_correct_password() {
    let fixture = fixture();
    fixture.credentials.add_user("a@x.com", "right", true);

    for _ in 0..MAX_FAILURES {
        let result = fixture.engine.authenticate("a@x.com", "wrong").await;
        assert!(matches!(result, Err(AuthError::IncorrectCredentials)));
    }

    // Fourth attempt with the right password is still refused, and the
    // deadline sits roughly one ban window in the future.
    let result = fixture.engine.authenticate("a@x.com", "right").await;
    match result {
        Err(AuthError::UserSuspended { until }) => {
            assert!(until > Utc::now());
            assert!(until <= Utc::now() + Duration::minutes(6));
        }
        other => panic!("expected suspension, got {other:?}"),
    }
}

#[tokio::test]
async fn authorize_resets_the_failure_counter() {
    let fixture = fixture();
    let user = fixture.credentials.add_user("a@x.com", "right", true);

    let _ = fixture.engine.authenticate("a@x.com", "wrong").await;
    assert_eq!(fixture.credentials.failed_count(user.id), 1);

    let mfa = fixture
        .engine
        .authenticate("a@x.com", "right")
        .await
        .expect("authenticate");
    let grant = fixture.engine.authorize(&mfa).await.expect("authorize");

    assert_eq!(fixture.credentials.failed_count(user.id), 0);
    assert!(!grant.access_token.is_empty());
    assert!(!grant.refresh_token.is_empty());
}

#[tokio::test]
async fn mfa_tokens_are_single_use() {
    let fixture = fixture();
    fixture.credentials.add_user("a@x.com", "right", true);

    let mfa = fixture
        .engine
        .authenticate("a@x.com", "right")
        .await
        .expect("authenticate");
    fixture.engine.authorize(&mfa).await.expect("authorize");

    let replay = fixture.engine.authorize(&mfa).await;
    assert!(matches!(replay, Err(AuthError::IncorrectCredentials)));
}

#[tokio::test]
async fn expired_mfa_token_is_rejected() {
    let fixture = fixture();
    let user = fixture.credentials.add_user("a@x.com", "right", true);
    fixture.credentials.insert_login_token(
        user.id,
        "stale-mfa",
        TokenKind::Mfa,
        Utc::now() - Duration::minutes(1),
    );

    let result = fixture.engine.authorize("stale-mfa").await;
    assert!(matches!(result, Err(AuthError::TokenExpired)));
}

#[tokio::test]
async fn refresh_rotates_and_replay_fails() {
    let fixture = fixture();
    fixture.credentials.add_user("a@x.com", "right", true);

    let mfa = fixture
        .engine
        .authenticate("a@x.com", "right")
        .await
        .expect("authenticate");
    let grant = fixture.engine.authorize(&mfa).await.expect("authorize");

    let rotated = fixture
        .engine
        .refresh(&grant.refresh_token)
        .await
        .expect("refresh");
    assert_ne!(rotated.refresh_token, grant.refresh_token);

    // The consumed value was deleted before replacements were issued.
    let replay = fixture.engine.refresh(&grant.refresh_token).await;
    assert!(matches!(replay, Err(AuthError::TokenNotFound)));
}

#[tokio::test]
async fn logout_deletes_the_refresh_token_without_a_session() {
    let fixture = fixture();
    fixture.credentials.add_user("a@x.com", "right", true);

    let mfa = fixture
        .engine
        .authenticate("a@x.com", "right")
        .await
        .expect("authenticate");
    let grant = fixture.engine.authorize(&mfa).await.expect("authorize");

    // Point logout at a session that does not exist; the refresh token must
    // still be invalidated.
    fixture
        .engine
        .logout(&grant.refresh_token, "session:missing:key")
        .await
        .expect("logout");

    assert_eq!(fixture.credentials.login_token_count(TokenKind::Refresh), 0);

    let again = fixture
        .engine
        .logout(&grant.refresh_token, "session:missing:key")
        .await;
    assert!(matches!(again, Err(AuthError::TokenNotFound)));
}

#[tokio::test]
async fn access_tokens_die_with_their_session() {
    let fixture = fixture();
    fixture.credentials.add_user("a@x.com", "right", true);

    let mfa = fixture
        .engine
        .authenticate("a@x.com", "right")
        .await
        .expect("authenticate");
    let grant = fixture.engine.authorize(&mfa).await.expect("authorize");

    let session = fixture
        .engine
        .verify_access(&grant.access_token)
        .await
        .expect("verify");
    assert_eq!(session.email, "a@x.com");

    // Deleting the session revokes the token despite its valid signature.
    fixture
        .sessions
        .delete_session_by_key(&session.session_key)
        .await
        .expect("delete session");

    let revoked = fixture.engine.verify_access(&grant.access_token).await;
    assert!(matches!(revoked, Err(AuthError::TokenExpired)));
}

#[tokio::test]
async fn reset_request_leaks_unknown_emails_by_design() {
    let fixture = fixture();
    let result = fixture.engine.request_password_reset("ghost@x.com").await;
    assert!(matches!(result, Err(AuthError::EmailNotFound)));
}

#[tokio::test]
async fn reset_request_succeeds_when_the_sender_fails() {
    let fixture = fixture_with_mailer(spawn_mailer(Arc::new(FailingSender)));
    fixture.credentials.add_user("a@x.com", "right", true);

    fixture
        .engine
        .request_password_reset("a@x.com")
        .await
        .expect("reset request");

    assert!(fixture.credentials.reset_token_value().is_some());
}

#[tokio::test]
async fn expired_reset_token_never_mutates_the_password() {
    let fixture = fixture();
    let user = fixture.credentials.add_user("a@x.com", "old", true);
    let original_hash = fixture.credentials.password_hash(user.id);
    fixture.credentials.insert_reset_token(
        user.id,
        "stale-reset",
        Utc::now() - Duration::minutes(1),
    );

    let result = fixture
        .engine
        .complete_password_reset("stale-reset", "new-password")
        .await;
    assert!(matches!(result, Err(AuthError::TokenExpired)));
    assert_eq!(fixture.credentials.password_hash(user.id), original_hash);
}

#[tokio::test]
async fn completed_reset_consumes_the_token_and_logs_in() {
    let fixture = fixture();
    let user = fixture.credentials.add_user("a@x.com", "old", true);

    fixture
        .engine
        .request_password_reset("a@x.com")
        .await
        .expect("reset request");
    let reset_token = fixture
        .credentials
        .reset_token_value()
        .expect("persisted token");

    let grant = fixture
        .engine
        .complete_password_reset(&reset_token, "brand-new")
        .await
        .expect("complete reset");
    assert_eq!(grant.user.id, user.id);
    assert!(!grant.access_token.is_empty());

    // Single-use: a second completion with the same token fails.
    let replay = fixture
        .engine
        .complete_password_reset(&reset_token, "again")
        .await;
    assert!(matches!(replay, Err(AuthError::TokenNotFound)));

    // The new password is live.
    fixture
        .engine
        .authenticate("a@x.com", "brand-new")
        .await
        .expect("authenticate with new password");
}

#[tokio::test]
async fn change_password_requires_the_current_one() {
    let fixture = fixture();
    let user = fixture.credentials.add_user("a@x.com", "current", true);

    let mismatch = fixture
        .engine
        .change_password(user.id, "not-current", "next")
        .await;
    assert!(matches!(mismatch, Err(AuthError::CurrentPasswordMismatch)));

    fixture
        .engine
        .change_password(user.id, "current", "next")
        .await
        .expect("change password");

    fixture
        .engine
        .authenticate("a@x.com", "next")
        .await
        .expect("authenticate with new password");
}
