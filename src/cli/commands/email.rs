//! Outbound email arguments.

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};

pub const ARG_SENDER_EMAIL: &str = "sender-email";
pub const ARG_RESET_TEMPLATE_ID: &str = "reset-template-id";
pub const ARG_MAILJET_API_KEY_PUBLIC: &str = "mailjet-api-key-public";
pub const ARG_MAILJET_API_KEY_PRIVATE: &str = "mailjet-api-key-private";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SENDER_EMAIL)
                .long(ARG_SENDER_EMAIL)
                .help("From address for password-reset emails")
                .default_value("no-reply@pordisto.dev")
                .env("PORDISTO_SENDER_EMAIL"),
        )
        .arg(
            Arg::new(ARG_RESET_TEMPLATE_ID)
                .long(ARG_RESET_TEMPLATE_ID)
                .help("Mailjet template id for the password-reset email")
                .default_value("0")
                .env("PORDISTO_RESET_TEMPLATE_ID")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_MAILJET_API_KEY_PUBLIC)
                .long(ARG_MAILJET_API_KEY_PUBLIC)
                .help("Mailjet public API key; emails are logged when unset")
                .env("PORDISTO_MAILJET_API_KEY_PUBLIC"),
        )
        .arg(
            Arg::new(ARG_MAILJET_API_KEY_PRIVATE)
                .long(ARG_MAILJET_API_KEY_PRIVATE)
                .help("Mailjet private API key")
                .env("PORDISTO_MAILJET_API_KEY_PRIVATE")
                .requires(ARG_MAILJET_API_KEY_PUBLIC),
        )
}

#[derive(Debug, Clone)]
pub struct Options {
    pub sender_email: String,
    pub reset_template_id: i64,
    pub mailjet_api_key_public: Option<String>,
    pub mailjet_api_key_private: Option<String>,
}

impl Options {
    /// Extract the parsed values.
    ///
    /// # Errors
    /// Returns an error if a defaulted argument is unexpectedly missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            sender_email: matches
                .get_one::<String>(ARG_SENDER_EMAIL)
                .cloned()
                .context("missing sender-email")?,
            reset_template_id: matches
                .get_one::<i64>(ARG_RESET_TEMPLATE_ID)
                .copied()
                .context("missing reset-template-id")?,
            mailjet_api_key_public: matches.get_one::<String>(ARG_MAILJET_API_KEY_PUBLIC).cloned(),
            mailjet_api_key_private: matches
                .get_one::<String>(ARG_MAILJET_API_KEY_PRIVATE)
                .cloned(),
        })
    }
}
