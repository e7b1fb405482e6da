//! # Pordisto (Authentication & Session Lifecycle Service)
//!
//! `pordisto` authenticates users and manages the full credential
//! lifecycle: password verification under a brute-force lockout policy,
//! two-step login (password → temporary MFA token → session), signed access
//! tokens, single-use rotated refresh tokens, and password-reset flows.
//!
//! ## Login State Machine
//!
//! `POST /account/authenticate` checks the password and answers with a
//! short-lived opaque MFA token; `POST /account/authorize` exchanges it for
//! a server-side session plus an access/refresh token pair. Refresh tokens
//! are strictly single-use: the presented value is deleted before a
//! replacement is issued.
//!
//! ## Revocation Model
//!
//! Access tokens are HS256-signed claims carrying `(user, session)`. The
//! session record in Redis is the source of truth: every authorized request
//! re-checks it, so deleting the session (logout, TTL) revokes outstanding
//! access tokens before their own expiry.
//!
//! ## Stores
//!
//! Durable records (users, failed-login counters, login and reset tokens)
//! live in Postgres; only token digests are persisted. Ephemeral sessions
//! live in Redis under `session:{user}:{session}` with a configurable TTL.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
