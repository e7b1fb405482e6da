//! Redis-backed session storage.
//!
//! Sessions live at `session:{user_id}:{session_id}` as JSON blobs with a
//! TTL, so an otherwise valid signed access token dies the moment its
//! session record expires or is deleted.

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use tokio::sync::OnceCell;
use uuid::Uuid;

use super::store::{session_key, SessionData, SessionStore};

pub struct RedisSessionStore {
    client: redis::Client,
    manager: OnceCell<ConnectionManager>,
}

impl RedisSessionStore {
    /// Parse the URL without connecting; the connection is established on
    /// first use.
    ///
    /// # Errors
    /// Returns an error when the URL is not a valid Redis URL.
    pub fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).context("invalid session store URL")?;
        Ok(Self {
            client,
            manager: OnceCell::new(),
        })
    }

    async fn manager(&self) -> Result<ConnectionManager> {
        let manager = self
            .manager
            .get_or_try_init(|| ConnectionManager::new(self.client.clone()))
            .await
            .context("failed to connect to session store")?;
        Ok(manager.clone())
    }

    /// Health probe.
    ///
    /// # Errors
    /// Returns an error when the store is unreachable.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.manager().await?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .context("failed to ping session store")?;
        Ok(())
    }
}

impl SessionStore for RedisSessionStore {
    async fn set_session(
        &self,
        user_id: Uuid,
        session_id: &str,
        data: &SessionData,
        ttl_seconds: i64,
    ) -> Result<()> {
        let payload = serde_json::to_string(data).context("failed to serialize session")?;
        let mut conn = self.manager().await?;
        redis::cmd("SET")
            .arg(session_key(user_id, session_id))
            .arg(payload)
            .arg("EX")
            .arg(ttl_seconds)
            .query_async::<_, ()>(&mut conn)
            .await
            .context("failed to store session")?;
        Ok(())
    }

    async fn session(&self, user_id: Uuid, session_id: &str) -> Result<Option<SessionData>> {
        let mut conn = self.manager().await?;
        let payload: Option<String> = redis::cmd("GET")
            .arg(session_key(user_id, session_id))
            .query_async(&mut conn)
            .await
            .context("failed to fetch session")?;

        payload
            .map(|raw| serde_json::from_str(&raw).context("failed to deserialize session"))
            .transpose()
    }

    async fn delete_session(&self, user_id: Uuid, session_id: &str) -> Result<()> {
        self.delete_session_by_key(&session_key(user_id, session_id))
            .await
    }

    async fn delete_session_by_key(&self, key: &str) -> Result<()> {
        let mut conn = self.manager().await?;
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, ()>(&mut conn)
            .await
            .context("failed to delete session")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_urls() {
        assert!(RedisSessionStore::new("not-a-url").is_err());
    }

    #[test]
    fn accepts_redis_urls_without_connecting() {
        assert!(RedisSessionStore::new("redis://127.0.0.1:6379").is_ok());
    }
}
