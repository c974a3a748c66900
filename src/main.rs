use anyhow::Context;
use axum::{extract::Request, ServiceExt};
use tower::Layer;
use tower_http::normalize_path::NormalizePathLayer;
use tracing_subscriber::EnvFilter;

use recruit_api::app::{build_app, AppState};
use recruit_api::config::{config, Environment};
use recruit_api::database::Database;
use recruit_api::routing::ProtectedRoutePolicy;
use recruit_api::storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Environment-specific file first so its values win over the shared .env,
    // which may itself be what names the environment.
    let environment = Environment::resolve(".env");
    let _ = dotenvy::from_filename(format!(".env.{}", environment.as_str()));
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config();
    tracing::info!("Starting {} in {:?} mode", config.server.name, config.environment);
    config.validate().context("invalid configuration")?;

    let policy = ProtectedRoutePolicy::load(&config.server.protected_routes_path)
        .context("failed to load protected route manifest")?;
    tracing::info!("{} protected routes loaded", policy.len());

    let database = Database::connect(&config.database).context("failed to configure database pool")?;
    database
        .test_connection()
        .await
        .context("database connection test failed")?;
    tracing::info!("Database connection established");

    let storage = storage::from_config(&config.storage).context("failed to configure object storage")?;
    let state = AppState::new(config.clone(), database.clone(), storage).context("failed to configure tokens")?;

    let (router, table) = build_app(&state, &policy).context("route registration failed")?;
    tracing::info!("{} routes ready", table.len());

    let app = NormalizePathLayer::trim_trailing_slash().layer(router);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Server running on http://{}", bind_addr);

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    database.close().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
