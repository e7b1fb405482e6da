//! Background mailer for password-reset notifications.
//!
//! Reset requests enqueue a message on an unbounded channel and return
//! immediately; a worker task owns delivery. The HTTP path therefore never
//! waits on, or fails because of, the mail provider. Delivery errors are
//! logged by the worker and are not observable by callers.

use anyhow::{bail, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error};

const MAILJET_SEND_URL: &str = "https://api.mailjet.com/v3.1/send";

/// One queued password-reset notification.
#[derive(Clone, Debug)]
pub struct ResetEmail {
    pub template_id: i64,
    pub recipient: String,
    pub sender: String,
    pub token: String,
}

/// Email delivery abstraction used by the mailer worker.
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error for the worker to log.
    fn send(&self, message: &ResetEmail) -> Result<()>;
}

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: &ResetEmail) -> Result<()> {
        debug!(
            recipient = %message.recipient,
            template_id = message.template_id,
            "password-reset email send stub"
        );
        Ok(())
    }
}

/// Mailjet transactional-template sender.
pub struct MailjetSender {
    client: reqwest::blocking::Client,
    api_key_public: String,
    api_key_private: SecretString,
}

impl MailjetSender {
    /// Build a sender with the service user agent.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(api_key_public: String, api_key_private: SecretString) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .context("failed to build mailjet client")?;

        Ok(Self {
            client,
            api_key_public,
            api_key_private,
        })
    }
}

impl EmailSender for MailjetSender {
    fn send(&self, message: &ResetEmail) -> Result<()> {
        let body = json!({
            "Messages": [{
                "From": { "Email": message.sender },
                "To": [{ "Email": message.recipient }],
                "TemplateID": message.template_id,
                "TemplateLanguage": true,
                "Variables": { "token": message.token },
            }]
        });

        let response = self
            .client
            .post(MAILJET_SEND_URL)
            .basic_auth(
                &self.api_key_public,
                Some(self.api_key_private.expose_secret()),
            )
            .json(&body)
            .send()
            .context("failed to reach mailjet")?;

        let status = response.status();
        if !status.is_success() {
            bail!("mailjet rejected the message: {status}");
        }
        Ok(())
    }
}

/// Handle for submitting reset emails to the worker.
#[derive(Clone)]
pub struct Mailer {
    tx: mpsc::UnboundedSender<ResetEmail>,
}

impl Mailer {
    /// Queue a message without awaiting delivery.
    pub fn submit(&self, message: ResetEmail) {
        if self.tx.send(message).is_err() {
            error!("mailer worker is gone; dropping password-reset email");
        }
    }
}

/// Spawn the delivery worker and return its submission handle.
///
/// Senders may block (HTTP calls), so each delivery runs on the blocking
/// thread pool rather than stalling the async worker loop.
pub fn spawn_mailer(sender: Arc<dyn EmailSender>) -> Mailer {
    let (tx, mut rx) = mpsc::unbounded_channel::<ResetEmail>();

    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let sender = Arc::clone(&sender);
            let recipient = message.recipient.clone();
            match tokio::task::spawn_blocking(move || sender.send(&message)).await {
                Ok(Ok(())) => {
                    debug!(recipient = %recipient, "password-reset email dispatched");
                }
                Ok(Err(err)) => {
                    error!("failed to send password-reset email to {recipient}: {err:#}");
                }
                Err(err) => {
                    error!("mailer delivery task failed: {err}");
                }
            }
        }
    });

    Mailer { tx }
}
