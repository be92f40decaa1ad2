//! Torque Monitor - Main Entry Point

use anyhow::Context;
use monitor::{init_logging, run, MonitorConfig};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = MonitorConfig::load(config_path.as_deref()).context("failed to load configuration")?;
    init_logging(&config.logging)?;

    info!("=== Torque Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Sensor source: {:?}", config.sensor.source);

    run(config).await?;

    Ok(())
}
