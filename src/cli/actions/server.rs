use crate::api::{
    self,
    handlers::account::AccountConfig,
    EmailSender, LogEmailSender, MailjetSender, ServerOptions,
};
use anyhow::Result;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::warn;

pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub redis_url: String,
    pub secret_key: SecretString,
    pub frontend_base_url: String,
    pub max_login_failures: i32,
    pub ban_minutes: i64,
    pub mfa_token_ttl_minutes: i64,
    pub access_token_ttl_seconds: i64,
    pub session_ttl_seconds: i64,
    pub refresh_token_ttl_minutes: i64,
    pub reset_token_ttl_minutes: i64,
    pub sender_email: String,
    pub reset_template_id: i64,
    pub mailjet_api_key_public: Option<String>,
    pub mailjet_api_key_private: Option<String>,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("dsn", &self.dsn)
            .field("redis_url", &self.redis_url)
            .field("secret_key", &"***")
            .field("frontend_base_url", &self.frontend_base_url)
            .field("max_login_failures", &self.max_login_failures)
            .field("ban_minutes", &self.ban_minutes)
            .field("sender_email", &self.sender_email)
            .finish_non_exhaustive()
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if a store is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let config = AccountConfig::new(args.secret_key, args.sender_email)
        .with_reset_template_id(args.reset_template_id)
        .with_max_login_failures(args.max_login_failures)
        .with_ban_minutes(args.ban_minutes)
        .with_mfa_token_ttl_minutes(args.mfa_token_ttl_minutes)
        .with_access_token_ttl_seconds(args.access_token_ttl_seconds)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_refresh_token_ttl_minutes(args.refresh_token_ttl_minutes)
        .with_reset_token_ttl_minutes(args.reset_token_ttl_minutes);

    let sender: Arc<dyn EmailSender> = match (
        args.mailjet_api_key_public,
        args.mailjet_api_key_private,
    ) {
        (Some(public), Some(private)) => {
            Arc::new(MailjetSender::new(public, SecretString::from(private))?)
        }
        _ => {
            warn!("Mailjet keys not configured; password-reset emails are logged only");
            Arc::new(LogEmailSender)
        }
    };

    api::new(
        ServerOptions {
            port: args.port,
            dsn: args.dsn,
            redis_url: args.redis_url,
            frontend_base_url: args.frontend_base_url,
        },
        config,
        sender,
    )
    .await
}
