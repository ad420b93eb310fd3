use std::sync::Arc;

use auth::Authenticator;
use auth::PasswordHasher;
use auth::TokenCodec;
use axum::Router;
use portal_service::config::Config;
use portal_service::domain::user::service::IdentityService;
use portal_service::inbound::http::policy::AccessPolicy;
use portal_service::inbound::http::router::create_router;
use portal_service::outbound::repositories::PostgresCredentialStore;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portal_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "portal-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        jwt_expiration_hours = config.jwt.expiration_hours,
        bcrypt_cost = config.password.bcrypt_cost,
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = 5,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let token_ttl = chrono::Duration::try_hours(config.jwt.expiration_hours)
        .ok_or_else(|| anyhow::anyhow!("jwt.expiration_hours out of range"))?;
    let authenticator = Arc::new(Authenticator::new(
        TokenCodec::new(config.jwt.secret.as_bytes()),
        PasswordHasher::with_cost(config.password.bcrypt_cost)?,
        token_ttl,
    ));
    let credential_store = Arc::new(PostgresCredentialStore::new(pg_pool));
    let identity_service = Arc::new(IdentityService::new(
        credential_store,
        Arc::clone(&authenticator),
    ));

    let access_policy = Arc::new(AccessPolicy::portal()?);
    tracing::info!(rules = access_policy.rules().len(), "Access policy loaded");

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(
        identity_service,
        authenticator,
        access_policy,
        Router::new(),
    );

    if let Err(e) = axum::serve(http_listener, http_application).await {
        tracing::error!(error = %e, "Server error");
    }

    Ok(())
}
