use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use house_price_api::{telemetry, ApiServer, Config, ModelRegistry, PredictionService, PredictionSink};

#[derive(Parser)]
#[command(name = "house-price-api")]
#[command(about = "Serves house price predictions from pre-trained regression models")]
struct Cli {
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Overrides `server.port` from the configuration.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    telemetry::init(&config.logging);
    info!("Starting House Price Prediction API");

    // Models must be in memory before the listener accepts anything.
    let registry = match ModelRegistry::load(&config.models).await {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            error!("Failed to load models: {}", e);
            return Err(e.into());
        }
    };

    let service = Arc::new(PredictionService::new(registry, PredictionSink::spawn_logger()));
    let mut server = ApiServer::new(service);

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => server = server.with_metrics(handle),
        Err(e) => warn!("Metrics recorder unavailable: {}", e),
    }

    let listener = TcpListener::bind(config.bind_address()).await?;
    server.serve(listener, shutdown_signal()).await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, stopping server...");
}
