use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use eventbuf::config::{AppConfig, LogFormat};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    info!(
        addr = %config.addr,
        metrics_addr = %config.metrics_addr,
        internal_addr = %config.internal_addr,
        state_file = %config.state_file.display(),
        retention_period = %humantime::format_duration(config.retention_period),
        prune_frequency = %humantime::format_duration(config.prune_frequency),
        "eventbuf starting"
    );

    let result = eventbuf::server::run(&config).await;
    info!("server exiting");

    if let Err(e) = result {
        error!(error = %e, "server stopped");
        return Err(e.into());
    }
    Ok(())
}
