//! incidentd - incident fan-out and on-call escalation service.

use anyhow::Result;
use clap::Parser;
use incidentd::{app::App, cli::Cli, config::Config, logging};
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            let _ = tracing_subscriber::fmt().try_init();
            error!("Failed to load configuration: {:#}", err);
            std::process::exit(1);
        }
    };

    logging::init(&config.log_level, config.log_format)?;

    info!("incidentd starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Listen Address: {}:{}", config.server.host, config.server.port);
    info!("Public Host: {}", config.server.public_host);
    info!("On-Call Enabled: {}", config.oncall.enable);
    info!("On-Call Initialized Only: {}", config.oncall.initialized_only);
    info!("On-Call Wait: {} minutes", config.oncall.wait_minutes);
    info!("On-Call Provider: {:?}", config.oncall.provider);
    info!("Escalation Store: {:?}", config.store.backend);
    info!("Metrics Enabled: {}", config.metrics.enabled);
    info!("-------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let app = App::builder(config).build(shutdown_rx).await?;

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown signal received. Shutting down gracefully...");
        let _ = shutdown_tx.send(true);
    });

    app.run().await?;
    info!("incidentd stopped.");
    Ok(())
}
