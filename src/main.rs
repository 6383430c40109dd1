use anyhow::Result;
use fleetwatch::config::{self, FleetwatchConfig};
use fleetwatch::dashboard::DashboardController;
use tokio::sync::watch;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleetwatch=info".into()),
        )
        .init();

    // Optional config file path as first argument; env vars override
    let config = match std::env::args().nth(1) {
        Some(path) => config::load_config(&path)
            .map_err(|e| anyhow::anyhow!("failed to load config {}: {}", path, e))?,
        None => FleetwatchConfig::from_env(),
    };

    info!(
        host = %config.api.host,
        port = config.api.port,
        "Fleetwatch starting"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("Ctrl-C received");
        let _ = shutdown_tx.send(true);
    });

    let controller = DashboardController::new(config);
    controller.run(shutdown_rx).await
}
