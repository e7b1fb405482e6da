//! Account engine configuration.
//!
//! Scalar settings only; everything here arrives from the CLI/environment and
//! is read-only for the lifetime of the server.

use secrecy::SecretString;

const DEFAULT_MAX_LOGIN_FAILURES: i32 = 10;
const DEFAULT_BAN_MINUTES: i64 = 5;
const DEFAULT_MFA_TOKEN_TTL_MINUTES: i64 = 5;
const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_SESSION_TTL_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_REFRESH_TOKEN_TTL_MINUTES: i64 = 30 * 24 * 60;
const DEFAULT_RESET_TOKEN_TTL_MINUTES: i64 = 30 * 24 * 60;

#[derive(Clone, Debug)]
pub struct AccountConfig {
    secret: SecretString,
    max_login_failures: i32,
    ban_minutes: i64,
    mfa_token_ttl_minutes: i64,
    access_token_ttl_seconds: i64,
    session_ttl_seconds: i64,
    refresh_token_ttl_minutes: i64,
    reset_token_ttl_minutes: i64,
    sender_email: String,
    reset_template_id: i64,
}

impl AccountConfig {
    #[must_use]
    pub fn new(secret: SecretString, sender_email: String) -> Self {
        Self {
            secret,
            max_login_failures: DEFAULT_MAX_LOGIN_FAILURES,
            ban_minutes: DEFAULT_BAN_MINUTES,
            mfa_token_ttl_minutes: DEFAULT_MFA_TOKEN_TTL_MINUTES,
            access_token_ttl_seconds: DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            refresh_token_ttl_minutes: DEFAULT_REFRESH_TOKEN_TTL_MINUTES,
            reset_token_ttl_minutes: DEFAULT_RESET_TOKEN_TTL_MINUTES,
            sender_email,
            reset_template_id: 0,
        }
    }

    #[must_use]
    pub fn with_max_login_failures(mut self, max: i32) -> Self {
        self.max_login_failures = max;
        self
    }

    #[must_use]
    pub fn with_ban_minutes(mut self, minutes: i64) -> Self {
        self.ban_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_mfa_token_ttl_minutes(mut self, minutes: i64) -> Self {
        self.mfa_token_ttl_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_access_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_token_ttl_minutes(mut self, minutes: i64) -> Self {
        self.refresh_token_ttl_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_reset_token_ttl_minutes(mut self, minutes: i64) -> Self {
        self.reset_token_ttl_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_reset_template_id(mut self, template_id: i64) -> Self {
        self.reset_template_id = template_id;
        self
    }

    pub(crate) fn secret(&self) -> &SecretString {
        &self.secret
    }

    pub(crate) fn max_login_failures(&self) -> i32 {
        self.max_login_failures
    }

    pub(crate) fn ban_minutes(&self) -> i64 {
        self.ban_minutes
    }

    pub(crate) fn mfa_token_ttl_minutes(&self) -> i64 {
        self.mfa_token_ttl_minutes
    }

    pub(crate) fn access_token_ttl_seconds(&self) -> i64 {
        self.access_token_ttl_seconds
    }

    pub(crate) fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    pub(crate) fn refresh_token_ttl_minutes(&self) -> i64 {
        self.refresh_token_ttl_minutes
    }

    pub(crate) fn reset_token_ttl_minutes(&self) -> i64 {
        self.reset_token_ttl_minutes
    }

    pub(crate) fn sender_email(&self) -> &str {
        &self.sender_email
    }

    pub(crate) fn reset_template_id(&self) -> i64 {
        self.reset_template_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn config() -> AccountConfig {
        AccountConfig::new(
            SecretString::from("secret".to_string()),
            "no-reply@pordisto.dev".to_string(),
        )
    }

    #[test]
    fn defaults() {
        let config = config();
        assert_eq!(config.secret().expose_secret(), "secret");
        assert_eq!(config.max_login_failures(), DEFAULT_MAX_LOGIN_FAILURES);
        assert_eq!(config.ban_minutes(), DEFAULT_BAN_MINUTES);
        assert_eq!(
            config.mfa_token_ttl_minutes(),
            DEFAULT_MFA_TOKEN_TTL_MINUTES
        );
        assert_eq!(
            config.access_token_ttl_seconds(),
            DEFAULT_ACCESS_TOKEN_TTL_SECONDS
        );
        assert_eq!(config.session_ttl_seconds(), DEFAULT_SESSION_TTL_SECONDS);
        assert_eq!(
            config.refresh_token_ttl_minutes(),
            DEFAULT_REFRESH_TOKEN_TTL_MINUTES
        );
        assert_eq!(
            config.reset_token_ttl_minutes(),
            DEFAULT_RESET_TOKEN_TTL_MINUTES
        );
        assert_eq!(config.sender_email(), "no-reply@pordisto.dev");
        assert_eq!(config.reset_template_id(), 0);
    }

    #[test]
    fn overrides() {
        let config = config()
            .with_max_login_failures(3)
            .with_ban_minutes(15)
            .with_mfa_token_ttl_minutes(2)
            .with_access_token_ttl_seconds(600)
            .with_session_ttl_seconds(1200)
            .with_refresh_token_ttl_minutes(60)
            .with_reset_token_ttl_minutes(120)
            .with_reset_template_id(42);

        assert_eq!(config.max_login_failures(), 3);
        assert_eq!(config.ban_minutes(), 15);
        assert_eq!(config.mfa_token_ttl_minutes(), 2);
        assert_eq!(config.access_token_ttl_seconds(), 600);
        assert_eq!(config.session_ttl_seconds(), 1200);
        assert_eq!(config.refresh_token_ttl_minutes(), 60);
        assert_eq!(config.reset_token_ttl_minutes(), 120);
        assert_eq!(config.reset_template_id(), 42);
    }
}
