//! Market density map service - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Market density map service
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via DMAP_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    dmap_telemetry::init_logging()?;

    info!("Starting density map v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > DMAP_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("DMAP_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");

    let config = dmap_app::AppConfig::load_or_default(&config_path)?;
    info!(
        base_url = %config.feed.client.base_url,
        category = %config.feed.client.category,
        server = config.server.enabled,
        "Configuration loaded"
    );

    let app = dmap_app::Application::new(config)?;
    app.run().await?;

    Ok(())
}
