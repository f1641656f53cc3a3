//! Stockline inventory service entry point.

use std::error::Error;
use std::sync::Arc;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use stockline_api::config::AppConfig;
use stockline_api::error::AppError;
use stockline_api::routes;
use stockline_api::state::AppState;
use stockline_cache::RedisProductCache;
use stockline_channel::{AmqpChannelSettings, AmqpEventChannel};
use stockline_inventory::application::InventoryContext;
use stockline_inventory::application::order_listener::start_order_listener;
use stockline_store::PgProductStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    info!("Starting Stockline inventory service");

    let config = AppConfig::from_env()?;
    info!(?config, "configuration loaded");

    // Store: connection pool and schema.
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(AppError::Database)?;
    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .map_err(AppError::Migration)?;

    // Cache and broker.
    let cache = RedisProductCache::connect(&config.redis_url)
        .await
        .map_err(|e| AppError::Cache(e.to_string()))?;
    let channel = Arc::new(
        AmqpEventChannel::connect(
            &config.amqp_url,
            AmqpChannelSettings {
                prefetch: config.consumer_prefetch,
            },
        )
        .await
        .map_err(|e| AppError::Channel(e.to_string()))?,
    );

    let inventory = InventoryContext::new(
        Arc::new(PgProductStore::new(pool)),
        Arc::new(cache),
        channel.clone(),
        config.inventory_settings(),
    );

    start_order_listener(&inventory, config.order_binding.clone())
        .await
        .map_err(|e| AppError::Channel(e.to_string()))?;

    let app = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/products", routes::products::router())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(inventory));

    let addr = config.socket_addr()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(AppError::Server)?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    if let Err(e) = channel.close().await {
        tracing::warn!(error = %e, "broker connection did not close cleanly");
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
