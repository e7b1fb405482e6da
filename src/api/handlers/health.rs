//! Health endpoint reporting database and session-store reachability.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use sqlx::{Connection, PgPool};
use std::sync::Arc;
use tracing::{error, info_span, Instrument};
use utoipa::ToSchema;

use crate::api::handlers::account::RedisSessionStore;
use crate::GIT_COMMIT_HASH;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    database: String,
    session_store: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Database and session store are healthy", body = Health),
        (status = 503, description = "Database or session store is unreachable", body = Health)
    ),
    tag = "health"
)]
pub async fn health(
    pool: Extension<PgPool>,
    sessions: Extension<Arc<RedisSessionStore>>,
) -> impl IntoResponse {
    let acquire_span = info_span!(
        "db.acquire",
        db.system = "postgresql",
        db.operation = "ACQUIRE"
    );
    let database = match pool.0.acquire().instrument(acquire_span).await {
        Ok(mut conn) => {
            let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
            match conn.ping().instrument(ping_span).await {
                Ok(()) => "ok",
                Err(err) => {
                    error!("Failed to ping database: {err}");
                    "unreachable"
                }
            }
        }
        Err(err) => {
            error!("Failed to acquire database connection: {err}");
            "unreachable"
        }
    };

    let session_store = match sessions.ping().await {
        Ok(()) => "ok",
        Err(err) => {
            error!("Failed to ping session store: {err:#}");
            "unreachable"
        }
    };

    let status = if database == "ok" && session_store == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
        session_store: session_store.to_string(),
    };

    (status, Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_serializes_all_fields() {
        let health = Health {
            commit: "abc1234".to_string(),
            name: "pordisto".to_string(),
            version: "0.1.0".to_string(),
            database: "ok".to_string(),
            session_store: "unreachable".to_string(),
        };
        let value = serde_json::to_value(&health).expect("serialize");
        assert_eq!(value["database"], "ok");
        assert_eq!(value["session_store"], "unreachable");
    }
}
