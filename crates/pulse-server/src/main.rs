//! Pulse Terminal server - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Pulse Terminal market data and provider health server
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via PULSE_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    pulse_telemetry::init_logging()?;

    info!("Starting Pulse server v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > PULSE_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("PULSE_CONFIG").ok())
        .unwrap_or_else(|| pulse_server::config::DEFAULT_CONFIG_PATH.to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = pulse_server::AppConfig::load(&config_path)?;
    info!(
        addr = %config.server.bind_addr(),
        upstream = %config.feed.base_url,
        "Configuration loaded"
    );

    let app = pulse_server::Application::new(config)?;
    app.run().await?;

    Ok(())
}
