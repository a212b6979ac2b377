//! `mascoord-bridge`: relays dashboard commands to the simulation and streams
//! monitoring events back to every connected dashboard.

use anyhow::{Context, Result};
use bridge_runtime::{load_config, BridgeRuntime};
use mascoord_telemetry::{init_telemetry, TelemetryConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // .env may carry logging settings too.
    let _ = dotenvy::dotenv();
    let _telemetry = init_telemetry(TelemetryConfig::from_env())?;

    let config = load_config().context("Invalid configuration")?;
    let runtime = BridgeRuntime::new(config)?;

    let result = runtime.run_until(shutdown_signal()).await;
    if let Err(e) = &result {
        error!(error = %e, "Bridge exited with an error");
    }
    result
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!(error = %e, "Could not listen for Ctrl+C; shutting down"),
    }
}
