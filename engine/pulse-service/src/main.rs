//! Pulse Production Service
//!
//! Entry point for the analytics ingestion pipeline. Opens the event store,
//! starts the persistence worker and the HTTP gateway, and drains the buffer
//! on shutdown.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use pulse_service::{
    config, initialize_logging, load_configuration, setup_signal_handlers, ServiceState,
};

#[derive(Parser)]
#[command(name = "pulse")]
#[command(about = "Pulse analytics event ingestion service")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (json, pretty, compact)
    #[arg(long)]
    log_format: Option<String>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Load configuration
    let mut service_config = load_configuration(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        service_config.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        service_config.logging.format = format;
    }
    config::validate_config(&service_config).context("Invalid command line overrides")?;

    if cli.print_config {
        println!("{}", config::to_toml(&service_config)?);
        return Ok(());
    }

    // Initialize logging; the guard must outlive every log call
    let _logging_guard = initialize_logging(&service_config.logging)?;

    info!("Starting Pulse Service v{}", env!("CARGO_PKG_VERSION"));
    info!("Started at {}", chrono::Utc::now().to_rfc3339());

    // Create service state
    let service_state = ServiceState::new(service_config).await?;
    info!("Service state initialized");

    // Setup signal handlers for graceful shutdown
    let shutdown_signal = setup_signal_handlers()?;
    info!("Signal handlers configured");

    service_state.start_worker().await;
    let addr = service_state.start_gateway().await?;

    // Wait for shutdown signal
    info!("Pulse Service is running on {}. Press Ctrl+C to shutdown gracefully.", addr);
    let _ = shutdown_signal.await;

    info!("Shutdown signal received. Initiating graceful shutdown...");
    service_state.shutdown().await?;

    info!("Pulse Service shutdown complete");
    Ok(())
}
