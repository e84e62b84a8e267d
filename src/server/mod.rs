//! HTTP surface: Axum router, middleware stack, and server lifecycle.
//!
//! The handlers stay thin; every decision about similarity lives in
//! [`crate::engine`]. This module only translates HTTP in and out.

pub mod config;
pub mod error;
pub mod routes;

pub use config::ServerConfig;
pub use error::ServerError;

use crate::engine::Engine;
use crate::store::CorpusStore;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the router with all routes and middleware.
///
/// The body limit sits a little above the engine's upload ceiling so that
/// the engine, not the transport, reports oversize uploads with a proper
/// JSON envelope; the transport limit only catches runaway bodies.
pub fn build_router(engine: Arc<Engine>, config: &ServerConfig) -> Router {
    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/file/{digest}", get(routes::file_report))
        .route("/api/reload", post(routes::reload))
        .route("/api/compare", post(routes::compare))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes + 1024 * 1024))
        .layer(TimeoutLayer::new(config.timeout()))
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

/// Start the similarity service and block until shutdown.
///
/// Initializes structured JSON logging, opens the corpus store, builds the
/// engine and router, and serves until SIGTERM or Ctrl+C.
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .with_target(false)
        .json()
        .init();

    let store = CorpusStore::new(&config.database_path);
    let engine = Arc::new(Engine::open(store, config.engine_config())?);
    let stats = engine.stats();

    let addr: SocketAddr = config.socket_addr()?;
    let app = build_router(engine, &config);

    info!(
        %addr,
        entries = stats.entries,
        database = %config.database_path,
        "starting similarity service"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
