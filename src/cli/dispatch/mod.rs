//! Command-line argument dispatch and server initialization.
//!
//! This module maps validated CLI arguments to the appropriate action, such
//! as starting the API server with its full configuration.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{account, email};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;
    let redis_url = matches
        .get_one::<String>("redis-url")
        .cloned()
        .context("missing required argument: --redis-url")?;
    let secret_key = matches
        .get_one::<String>("secret-key")
        .cloned()
        .context("missing required argument: --secret-key")?;
    let frontend_base_url = matches
        .get_one::<String>("frontend-base-url")
        .cloned()
        .context("missing required argument: --frontend-base-url")?;

    let account_opts = account::Options::parse(matches)?;
    let email_opts = email::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        redis_url,
        secret_key: SecretString::from(secret_key),
        frontend_base_url,
        max_login_failures: account_opts.max_login_failures,
        ban_minutes: account_opts.ban_minutes,
        mfa_token_ttl_minutes: account_opts.mfa_token_ttl_minutes,
        access_token_ttl_seconds: account_opts.access_token_ttl_seconds,
        session_ttl_seconds: account_opts.session_ttl_seconds,
        refresh_token_ttl_minutes: account_opts.refresh_token_ttl_minutes,
        reset_token_ttl_minutes: account_opts.reset_token_ttl_minutes,
        sender_email: email_opts.sender_email,
        reset_template_id: email_opts.reset_template_id,
        mailjet_api_key_public: email_opts.mailjet_api_key_public,
        mailjet_api_key_private: email_opts.mailjet_api_key_private,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::actions::Action;

    #[test]
    fn secret_key_is_required() {
        temp_env::with_vars(
            [
                ("PORDISTO_SECRET_KEY", None::<&str>),
                (
                    "PORDISTO_DSN",
                    Some("postgres://user@localhost:5432/pordisto"),
                ),
            ],
            || {
                let command = crate::cli::commands::new();
                let result = command.try_get_matches_from(vec!["pordisto"]);
                assert!(result.is_err());
            },
        );
    }

    #[test]
    fn server_action_carries_the_settings() {
        temp_env::with_vars(
            [
                ("PORDISTO_SECRET_KEY", Some("super-secret")),
                (
                    "PORDISTO_DSN",
                    Some("postgres://user@localhost:5432/pordisto"),
                ),
                ("PORDISTO_BAN_MINUTES", Some("30")),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec!["pordisto"]);
                let action = handler(&matches).expect("server action");

                let Action::Server(args) = action;
                assert_eq!(args.port, 8080);
                assert_eq!(args.dsn, "postgres://user@localhost:5432/pordisto");
                assert_eq!(args.redis_url, "redis://127.0.0.1:6379");
                assert_eq!(args.ban_minutes, 30);
                assert_eq!(args.sender_email, "no-reply@pordisto.dev");
            },
        );
    }
}
