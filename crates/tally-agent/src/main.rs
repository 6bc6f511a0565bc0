use anyhow::Result;
use tally_agent::config::AgentConfig;
use tally_agent::Agent;
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

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tally=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/agent.toml".to_string());

    let config = AgentConfig::load(&config_path)?;
    tracing::info!(server = %config.base_url(), "tally-agent starting");

    let agent = Agent::new(config)?;
    let cancel = CancellationToken::new();
    let pipeline = tokio::spawn(agent.run(cancel.clone()));

    tokio::select! {
        _ = signal::ctrl_c() => {}
        _ = terminate() => {}
    }
    tracing::info!("Shutting down gracefully");
    cancel.cancel();

    pipeline.await?;
    Ok(())
}
