//! Lockout and token-TTL arguments.

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};

pub const ARG_MAX_LOGIN_FAILURES: &str = "max-login-failures";
pub const ARG_BAN_MINUTES: &str = "ban-minutes";
pub const ARG_MFA_TOKEN_TTL_MINUTES: &str = "mfa-token-ttl-minutes";
pub const ARG_ACCESS_TOKEN_TTL_SECONDS: &str = "access-token-ttl-seconds";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_REFRESH_TOKEN_TTL_MINUTES: &str = "refresh-token-ttl-minutes";
pub const ARG_RESET_TOKEN_TTL_MINUTES: &str = "reset-token-ttl-minutes";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_MAX_LOGIN_FAILURES)
                .long(ARG_MAX_LOGIN_FAILURES)
                .help("Failed logins before the account is suspended")
                .default_value("10")
                .env("PORDISTO_MAX_LOGIN_FAILURES")
                .value_parser(clap::value_parser!(i32)),
        )
        .arg(
            Arg::new(ARG_BAN_MINUTES)
                .long(ARG_BAN_MINUTES)
                .help("Suspension window after too many failures, in minutes")
                .default_value("5")
                .env("PORDISTO_BAN_MINUTES")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_MFA_TOKEN_TTL_MINUTES)
                .long(ARG_MFA_TOKEN_TTL_MINUTES)
                .help("Lifetime of the temporary login token, in minutes")
                .default_value("5")
                .env("PORDISTO_MFA_TOKEN_TTL_MINUTES")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_TTL_SECONDS)
                .long(ARG_ACCESS_TOKEN_TTL_SECONDS)
                .help("Lifetime of signed access tokens, in seconds")
                .default_value("86400")
                .env("PORDISTO_ACCESS_TOKEN_TTL_SECONDS")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Lifetime of session records, in seconds")
                .default_value("86400")
                .env("PORDISTO_SESSION_TTL_SECONDS")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_TTL_MINUTES)
                .long(ARG_REFRESH_TOKEN_TTL_MINUTES)
                .help("Lifetime of refresh tokens, in minutes")
                .default_value("43200")
                .env("PORDISTO_REFRESH_TOKEN_TTL_MINUTES")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_RESET_TOKEN_TTL_MINUTES)
                .long(ARG_RESET_TOKEN_TTL_MINUTES)
                .help("Lifetime of password-reset tokens, in minutes")
                .default_value("43200")
                .env("PORDISTO_RESET_TOKEN_TTL_MINUTES")
                .value_parser(clap::value_parser!(i64)),
        )
}

#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub max_login_failures: i32,
    pub ban_minutes: i64,
    pub mfa_token_ttl_minutes: i64,
    pub access_token_ttl_seconds: i64,
    pub session_ttl_seconds: i64,
    pub refresh_token_ttl_minutes: i64,
    pub reset_token_ttl_minutes: i64,
}

impl Options {
    /// Extract the parsed values.
    ///
    /// # Errors
    /// Returns an error if a defaulted argument is unexpectedly missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            max_login_failures: matches
                .get_one::<i32>(ARG_MAX_LOGIN_FAILURES)
                .copied()
                .context("missing max-login-failures")?,
            ban_minutes: matches
                .get_one::<i64>(ARG_BAN_MINUTES)
                .copied()
                .context("missing ban-minutes")?,
            mfa_token_ttl_minutes: matches
                .get_one::<i64>(ARG_MFA_TOKEN_TTL_MINUTES)
                .copied()
                .context("missing mfa-token-ttl-minutes")?,
            access_token_ttl_seconds: matches
                .get_one::<i64>(ARG_ACCESS_TOKEN_TTL_SECONDS)
                .copied()
                .context("missing access-token-ttl-seconds")?,
            session_ttl_seconds: matches
                .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .context("missing session-ttl-seconds")?,
            refresh_token_ttl_minutes: matches
                .get_one::<i64>(ARG_REFRESH_TOKEN_TTL_MINUTES)
                .copied()
                .context("missing refresh-token-ttl-minutes")?,
            reset_token_ttl_minutes: matches
                .get_one::<i64>(ARG_RESET_TOKEN_TTL_MINUTES)
                .copied()
                .context("missing reset-token-ttl-minutes")?,
        })
    }
}
