//! Shared fixtures for handler tests.
//!
//! The engine here is wired against lazy connections; validation paths never
//! touch Postgres or Redis.

use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

use crate::api::email::{spawn_mailer, LogEmailSender};

use super::{AccountConfig, AppEngine, AuthEngine, PgCredentialStore, RedisSessionStore};

pub(crate) fn test_engine() -> Arc<AppEngine> {
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://postgres@localhost/postgres")
        .expect("lazy test pool");
    let credentials = Arc::new(PgCredentialStore::new(pool));
    let sessions =
        Arc::new(RedisSessionStore::new("redis://127.0.0.1:6379").expect("test session store"));
    let mailer = spawn_mailer(Arc::new(LogEmailSender));
    let config = AccountConfig::new(
        SecretString::from("test-secret".to_string()),
        "no-reply@pordisto.dev".to_string(),
    );

    Arc::new(AuthEngine::new(credentials, sessions, mailer, config))
}
