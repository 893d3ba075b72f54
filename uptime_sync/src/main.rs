//! Uptime synchroniser binary, run once per scheduler tick

use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uptime_sync::config::DEFAULT_CONFIG_PATH;
use uptime_sync::{Config, Result, Synchronizer};

#[derive(Debug, Parser)]
#[command(version, about = "Send uptime ratios from UptimeRobot to Cachet metrics")]
struct Cli {
    /// Path to the configuration file
    #[arg(env = "UPTIME_SYNC_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    initialize_tracing();

    let cli = Cli::parse();

    info!("Starting uptime_sync v{}", env!("CARGO_PKG_VERSION"));

    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load {}: {}", cli.config.display(), e);
            std::process::exit(1);
        }
    };

    info!(
        "Loaded {} monitors from {}, provider: {}, window: {} days",
        config.monitors.len(),
        cli.config.display(),
        config.uptime_robot.base_url,
        config.uptime_robot.uptime_window_days
    );

    let synchronizer = match Synchronizer::from_config(&config) {
        Ok(synchronizer) => synchronizer,
        Err(e) => {
            error!("Synchroniser setup failed: {}", e);
            std::process::exit(1);
        }
    };

    // Individual monitor failures are already logged and do not change the exit status
    synchronizer.synchronize_all(&config.monitors).await;

    Ok(())
}

/// Initialize structured logging
fn initialize_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .json();

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
