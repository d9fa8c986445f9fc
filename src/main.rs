//! Tiered Cache - admin server
//!
//! Serves the cache admin API over a Redis tier with an in-process fallback.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiered_cache::api::{create_router, AppState};
use tiered_cache::cache::{CacheService, RemoteBackend, RemoteCache};
use tiered_cache::Config;

/// Main entry point for the cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the remote tier (if enabled) and ping it once
/// 4. Build the cache facade; the in-process store is created on first fallback
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tiered_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tiered Cache Server");

    let config = Config::from_env();
    info!(
        redis_enabled = config.redis_enabled,
        default_ttl = config.default_ttl,
        memory_max_keys = config.memory_max_keys,
        port = config.server_port,
        "Configuration loaded"
    );

    let remote = match config.remote_config() {
        Some(remote_config) => {
            let remote = RemoteCache::new(remote_config).context("invalid Redis configuration")?;
            match remote.ping().await {
                Ok(()) => info!(endpoint = %remote.config().endpoint(), "Connected to Redis"),
                Err(err) => warn!(
                    endpoint = %remote.config().endpoint(),
                    error = %err,
                    "Redis unreachable at startup; calls will fall back until it recovers"
                ),
            }
            let remote: Arc<dyn RemoteBackend> = Arc::new(remote);
            Some(remote)
        }
        None => {
            info!("Redis disabled; using in-process cache only");
            None
        }
    };

    let state = AppState::new(CacheService::new(remote, config.memory_config()));
    let cache = Arc::clone(&state.cache);

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    cache.shutdown();
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
