use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use linksters_api::config::{NotifyBackend, ServerConfig};
use linksters_api::router::build_app_router;
use linksters_api::state::AppState;
use linksters_db::PoolSettings;
use linksters_notify::{ChannelHandle, MemoryBridge, NotificationBridge, SnsBridge};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Channel created for the memory backend when `MAIN_CHANNEL` is unset.
const DEV_MAIN_CHANNEL: &str = "linksters-main";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linksters_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        backend = ?config.notify_backend,
        "Loaded server configuration"
    );

    // --- Database ---
    let settings = PoolSettings {
        max_connections: config.db_max_connections,
        acquire_timeout: config.store_timeout(),
    };
    let pool = linksters_db::create_pool(&config.database_url, settings)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    linksters_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    linksters_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Notification bridge ---
    let (bridge, main_channel): (Arc<dyn NotificationBridge>, ChannelHandle) =
        match config.notify_backend {
            NotifyBackend::Sns => {
                let main_channel = config
                    .main_channel
                    .clone()
                    .expect("MAIN_CHANNEL must be set for the sns backend");
                let bridge = SnsBridge::from_env(&config.aws_region).await;
                (Arc::new(bridge), ChannelHandle::new(main_channel))
            }
            NotifyBackend::Memory => {
                let bridge = MemoryBridge::new();
                let main_channel = match config.main_channel.clone() {
                    Some(handle) => ChannelHandle::new(handle),
                    None => bridge
                        .create_channel(DEV_MAIN_CHANNEL)
                        .await
                        .expect("Failed to create the main channel"),
                };
                tracing::warn!("Using the in-memory notification bridge; no texts will be sent");
                (Arc::new(bridge), main_channel)
            }
        };
    tracing::info!(main_channel = %main_channel, "Notification bridge ready");

    // --- App state ---
    let state = AppState::build(pool.clone(), config.clone(), bridge, main_channel)
        .await
        .expect("Failed to load the initial cache snapshot");
    tracing::info!("Initial cache snapshot loaded");

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    let budget = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(budget, pool.close()).await.is_err() {
        tracing::warn!(?budget, "Database pool did not close in time");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
