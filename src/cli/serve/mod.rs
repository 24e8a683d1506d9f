//! Serve command - runs the gateway HTTP server

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use crate::api::create_router;
use crate::config::AppConfig;
use crate::infrastructure::observability::{init_metrics, init_tracing};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Run the gateway until SIGINT or SIGTERM
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    let tracing_guard = init_tracing(&config.logging.to_logging(), &config.observability.tracing);

    let app = crate::create_app(&config).await?;
    let worker = tokio::spawn(app.worker);
    let background = app.background;

    let metrics = init_metrics(&config.observability.metrics);
    let router = create_router(app.state, metrics);

    let addr = build_socket_addr(&config)?;
    info!("Starting gateway on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Draining background cache tasks");
    if tokio::time::timeout(DRAIN_TIMEOUT, background.flush()).await.is_err() {
        warn!(timeout_secs = DRAIN_TIMEOUT.as_secs(), "Background queue did not drain in time");
    }
    drop(background);
    worker.abort();

    info!("Gateway shutdown complete");
    tracing_guard.shutdown();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

fn build_socket_addr(config: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    )))
}
