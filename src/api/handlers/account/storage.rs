//! Postgres-backed credential storage.
//!
//! Opaque token values never touch the database: rows store a SHA-256 digest
//! and lookups hash the presented value first. Failure counting is a single
//! UPDATE so concurrent attempts against one account cannot race the
//! counter.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::store::{
    CredentialStore, LoginToken, PasswordResetToken, Role, TokenKind, User,
};

const USER_COLUMNS: &str = r"
    SELECT u.id, u.name, u.email, u.password_hash, u.active,
           u.failed_login_count, u.login_blocked_until,
           r.id AS role_id, r.name AS role
    FROM users u
    JOIN roles r ON r.id = u.role_id
";

pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Digest an opaque token for storage/lookup.
fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

fn query_span(operation: &str, statement: &str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn user_from_row(row: &PgRow) -> Result<User> {
    let role_name: String = row.get("role");
    let role = Role::from_wire(&role_name)
        .ok_or_else(|| anyhow!("unknown role stored for user: {role_name}"))?;

    Ok(User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role,
        role_id: row.get("role_id"),
        active: row.get("active"),
        failed_login_count: row.get("failed_login_count"),
        login_blocked_until: row.get::<Option<DateTime<Utc>>, _>("login_blocked_until"),
    })
}

impl CredentialStore for PgCredentialStore {
    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = format!("{USER_COLUMNS} WHERE u.email = $1");
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to lookup user by email")?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let query = format!("{USER_COLUMNS} WHERE u.id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to lookup user by id")?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn user_by_login_token(
        &self,
        token: &str,
        kind: TokenKind,
    ) -> Result<Option<(User, LoginToken)>> {
        // The token id and expiry flag ride along with the user columns.
        let query = r"
            SELECT u.id, u.name, u.email, u.password_hash, u.active,
                   u.failed_login_count, u.login_blocked_until,
                   r.id AS role_id, r.name AS role,
                   t.id AS token_id, (t.expires_at < NOW()) AS expired
            FROM login_tokens t
            JOIN users u ON u.id = t.user_id
            JOIN roles r ON r.id = u.role_id
            WHERE t.token_hash = $1 AND t.kind = $2
        ";
        let row = sqlx::query(query)
            .bind(hash_token(token))
            .bind(kind.as_str())
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup user by login token")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let user = user_from_row(&row)?;
        let login_token = LoginToken {
            id: row.get("token_id"),
            user_id: user.id,
            kind,
            expired: row.get("expired"),
        };
        Ok(Some((user, login_token)))
    }

    async fn add_login_token(
        &self,
        user_id: Uuid,
        token: &str,
        kind: TokenKind,
        ttl_minutes: i64,
    ) -> Result<()> {
        let query = r"
            INSERT INTO login_tokens (user_id, token_hash, kind, expires_at)
            VALUES ($1, $2, $3, NOW() + ($4 * INTERVAL '1 minute'))
        ";
        sqlx::query(query)
            .bind(user_id)
            .bind(hash_token(token))
            .bind(kind.as_str())
            .bind(ttl_minutes)
            .execute(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .context("failed to insert login token")?;
        Ok(())
    }

    async fn login_token(&self, token: &str, kind: TokenKind) -> Result<Option<LoginToken>> {
        let query = r"
            SELECT id, user_id, (expires_at < NOW()) AS expired
            FROM login_tokens
            WHERE token_hash = $1 AND kind = $2
        ";
        let row = sqlx::query(query)
            .bind(hash_token(token))
            .bind(kind.as_str())
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup login token")?;

        Ok(row.map(|row| LoginToken {
            id: row.get("id"),
            user_id: row.get("user_id"),
            kind,
            expired: row.get("expired"),
        }))
    }

    async fn delete_login_token(&self, id: i64) -> Result<()> {
        let query = "DELETE FROM login_tokens WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await
            .context("failed to delete login token")?;

        // Zero rows means another request already consumed this token; the
        // caller must not issue replacement credentials in that case.
        if result.rows_affected() == 0 {
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
        // Counter increment and ban-window update happen in one statement;
        // there is no read-then-write window for concurrent attempts.
        let query = r"
            UPDATE users
            SET failed_login_count = failed_login_count + 1,
                login_blocked_until = CASE
                    WHEN failed_login_count + 1 >= $2
                        THEN NOW() + ($3 * INTERVAL '1 minute')
                    ELSE login_blocked_until
                END
            WHERE id = $1
            RETURNING failed_login_count
        ";
        let row = sqlx::query(query)
            .bind(user_id)
            .bind(max_failures)
            .bind(ban_minutes)
            .fetch_one(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to record failed login")?;

        Ok(row.get("failed_login_count"))
    }

    async fn reset_failed_logins(&self, user_id: Uuid) -> Result<()> {
        let query = r"
            UPDATE users
            SET failed_login_count = 0, login_blocked_until = NULL
            WHERE id = $1
        ";
        sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to reset failed-login counter")?;
        Ok(())
    }

    async fn add_password_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordResetToken> {
        let query = r"
            INSERT INTO password_reset_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
        ";
        sqlx::query(query)
            .bind(user_id)
            .bind(hash_token(token))
            .bind(expires_at)
            .execute(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .context("failed to insert password reset token")?;

        Ok(PasswordResetToken {
            user_id,
            token: token.to_string(),
            expires_at,
        })
    }

    async fn password_reset_token(&self, token: &str) -> Result<Option<PasswordResetToken>> {
        let query = r"
            SELECT user_id, expires_at
            FROM password_reset_tokens
            WHERE token_hash = $1
        ";
        let row = sqlx::query(query)
            .bind(hash_token(token))
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup password reset token")?;

        Ok(row.map(|row| PasswordResetToken {
            user_id: row.get("user_id"),
            token: token.to_string(),
            expires_at: row.get("expires_at"),
        }))
    }

    async fn set_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
        reset_token: &str,
    ) -> Result<Option<User>> {
        // Consuming the token and writing the hash commit together or not at
        // all.
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin set-password transaction")?;

        let query = r"
            DELETE FROM password_reset_tokens
            WHERE token_hash = $1 AND user_id = $2
            RETURNING id
        ";
        let consumed = sqlx::query(query)
            .bind(hash_token(reset_token))
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .instrument(query_span("DELETE", query))
            .await
            .context("failed to consume password reset token")?;

        if consumed.is_none() {
            let _ = tx.rollback().await;
            return Ok(None);
        }

        let query = "UPDATE users SET password_hash = $2 WHERE id = $1";
        sqlx::query(query)
            .bind(user_id)
            .bind(password_hash)
            .execute(&mut *tx)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to update password hash")?;

        tx.commit()
            .await
            .context("failed to commit set-password transaction")?;

        self.user_by_id(user_id).await
    }

    async fn set_new_password(&self, user_id: Uuid, password_hash: &str) -> Result<()> {
        let query = "UPDATE users SET password_hash = $2 WHERE id = $1";
        let result = sqlx::query(query)
            .bind(user_id)
            .bind(password_hash)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to update password hash")?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("no password updated for user {user_id}"));
        }
        Ok(())
    }

    async fn set_user_active(&self, user_id: Uuid, active: bool) -> Result<bool> {
        let query = "UPDATE users SET active = $2 WHERE id = $1";
        let result = sqlx::query(query)
            .bind(user_id)
            .bind(active)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to update active flag")?;

        Ok(result.rows_affected() > 0)
    }
}
