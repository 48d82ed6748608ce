use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use taskhub_api::config;
use taskhub_api::database::Database;
use taskhub_api::services::sweep::spawn_sweeper;
use taskhub_api::{app, is_production, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")))
        .init();

    let config = config::config().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    tracing::info!("Starting TaskHub API in {:?} mode", config.environment);
    if is_production!() && config.security.enable_cors && config.security.cors_origins.is_empty() {
        tracing::warn!("CORS is enabled without an origin list; every origin will be accepted");
    }

    let db = Database::connect(&config.database).await.context("database connection failed")?;
    db.migrate().await.context("database migration failed")?;

    let state = AppState::build(db.clone(), config.clone())?;

    let sweeper = if config.sweep.enabled {
        tracing::info!(interval_secs = config.sweep.interval_secs, "overdue sweep scheduled");
        Some(spawn_sweeper(
            db.pool().clone(),
            state.notifier.clone(),
            Duration::from_secs(config.sweep.interval_secs),
        ))
    } else {
        None
    };

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("TaskHub API listening on http://{}", bind_addr);

    let notifier = state.notifier.clone();
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    notifier.flush().await;
    db.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
