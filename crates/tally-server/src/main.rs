use anyhow::Result;
use tally_server::app::build_http_app;
use tally_server::backend::StorageBackend;
use tally_server::config::ServerConfig;
use tally_server::state::AppState;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut sig) => {
            sig.recv().await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

async fn shutdown_signal(cancel: CancellationToken) {
    tokio::select! {
        _ = signal::ctrl_c() => {}
        _ = terminate() => {}
    }
    tracing::info!("Shutting down gracefully");
    cancel.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tally=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/server.toml".to_string());
    let config = ServerConfig::load(&config_path)?;

    let backend = StorageBackend::from_config(&config).await?;
    let cancel = CancellationToken::new();
    let snapshot_task = backend.spawn_background(cancel.clone());

    let app = build_http_app(AppState::new(backend.storage()));
    let listener = tokio::net::TcpListener::bind(&config.address).await?;
    tracing::info!(address = %config.address, "tally-server listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await;
    // Stop the snapshot loop even if serving failed.
    cancel.cancel();

    if let Some(task) = snapshot_task {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Snapshot task failed");
        }
    }
    backend.shutdown().await?;
    served?;

    tracing::info!("tally-server stopped");
    Ok(())
}
