//! HTTP server wiring: stores, engine, middleware stack, and routes.

use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    middleware,
    routing::get,
    Extension,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;

use crate::api::handlers::account::{
    middleware::{require_admin, require_session},
    AccountConfig, AuthEngine, PgCredentialStore, RedisSessionStore,
};

pub(crate) mod email;
pub(crate) mod handlers;
// OpenAPI router wiring and route registration live in openapi.rs.
mod openapi;

pub use email::{EmailSender, LogEmailSender, MailjetSender};
pub use openapi::openapi;

/// Everything the server needs beyond the account configuration.
#[derive(Debug)]
pub struct ServerOptions {
    pub port: u16,
    pub dsn: String,
    pub redis_url: String,
    pub frontend_base_url: String,
}

/// Start the server.
///
/// # Errors
/// Returns an error if a store is unreachable or the listener cannot bind.
pub async fn new(
    options: ServerOptions,
    config: AccountConfig,
    sender: Arc<dyn EmailSender>,
) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&options.dsn)
        .await
        .context("Failed to connect to database")?;

    let sessions = Arc::new(
        RedisSessionStore::new(&options.redis_url).context("Invalid session store URL")?,
    );
    // Fail fast on a dead session store instead of at the first login.
    sessions
        .ping()
        .await
        .context("Failed to connect to session store")?;

    let credentials = Arc::new(PgCredentialStore::new(pool.clone()));
    let mailer = email::spawn_mailer(sender);
    let engine = Arc::new(AuthEngine::new(
        credentials,
        Arc::clone(&sessions),
        mailer,
        config,
    ));

    let frontend_origin = frontend_origin(&options.frontend_base_url)?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    // Session middleware wraps the protected group; the admin group adds the
    // role gate inside it. The OpenAPI document is generated from the same
    // wiring in openapi.rs.
    let (public, _openapi) = openapi::public_router().split_for_parts();
    let (protected, _openapi) = openapi::protected_router().split_for_parts();
    let (admin, _openapi) = openapi::admin_router().split_for_parts();

    let protected = protected
        .merge(admin.route_layer(middleware::from_fn(require_admin)))
        .route_layer(middleware::from_fn(require_session));

    let app = public
        .merge(protected)
        .route("/", get(handlers::root::root))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(engine))
                .layer(Extension(sessions))
                .layer(Extension(pool)),
        );

    let listener = TcpListener::bind(format!("::0:{}", options.port)).await?;

    info!("Listening on [::]:{}", options.port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}
