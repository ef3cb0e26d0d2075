use anyhow::{Context, Result};
use domain::services::{ChannelEventPublisher, EventHandler, LoggingEventHandler};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use prompthub_api::{app, config, jobs, middleware, services};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = config::Config::load().context("Failed to load configuration")?;

    middleware::logging::init_logging(&config.logging)?;
    middleware::init_metrics()?;

    info!("Starting PromptHub API v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::create_pool(&(&config.database).into()).await?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    let outcome = services::admin_bootstrap::bootstrap_admin(&pool, &config.seed).await?;
    info!(outcome = ?outcome, "Admin bootstrap finished");

    let config_store = services::ConfigStore::default();
    let snapshot = config_store.reload(&pool).await?;
    info!(entries = snapshot.len(), "Runtime settings loaded");

    let (publisher, receiver) = ChannelEventPublisher::channel(config.events.channel_capacity);
    let handlers: Vec<Arc<dyn EventHandler>> = vec![Arc::new(LoggingEventHandler::new())];
    let dispatcher = services::events::spawn_dispatcher(receiver, handlers);

    let addr = config.socket_addr()?;
    let jobs_config = config.jobs.clone();
    let state = app::AppState::new(config, pool.clone())?
        .with_config_store(config_store)
        .with_events(Arc::new(publisher));

    let mut scheduler = jobs::scheduler_for(&jobs_config, &pool, state.rate_limiter.clone());
    if jobs_config.enabled {
        scheduler.start();
    } else {
        info!("Background jobs disabled");
    }
    let app = app::router(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(10)).await;
    // The router held the last publisher, so the dispatcher drains and exits.
    if tokio::time::timeout(Duration::from_secs(5), dispatcher).await.is_err() {
        tracing::warn!("Event dispatcher did not drain in time");
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
