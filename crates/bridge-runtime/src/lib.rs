//! # Bridge Runtime
//!
//! Process-level wiring for the dashboard bridge.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (`.env`, then the process environment)
//! 2. Connect to the broker, retrying with exponential backoff
//! 3. Start the bridge service (bus paths, core, WebSocket and admin servers)
//! 4. Wait for the shutdown signal
//! 5. Close sessions, stop servers, close the broker connection
//!
//! Running out of connection attempts is fatal. Everything after a successful
//! connect degrades instead of exiting.

pub mod config;

pub use config::{load_config, load_config_from, RuntimeConfig};

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use mascoord_telemetry::metric_inc;
use mascoord_telemetry::metrics::BUS_CONNECT_ATTEMPTS;
use mc_03_dashboard_bridge::domain::BrokerConfig;
use mc_03_dashboard_bridge::{DashboardBridgeService, RunningBridge};
use shared_bus::amqp::redact_endpoint;
use shared_bus::{AmqpConnection, BusError, InMemoryBroker, TopicBus};
use tracing::{info, warn};

/// Run `connect` until it succeeds or `config.connect_attempts` is used up.
///
/// Waits [`BrokerConfig::backoff`] between attempts and returns the last
/// error once every attempt has failed.
pub async fn connect_with_retry<B, F, Fut>(config: &BrokerConfig, mut connect: F) -> Result<B, BusError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<B, BusError>>,
{
    let attempts = config.connect_attempts.max(1);
    let mut attempt = 1;
    loop {
        match connect().await {
            Ok(bus) => {
                metric_inc!(BUS_CONNECT_ATTEMPTS, &["success"]);
                info!(attempt, "Connected to broker");
                return Ok(bus);
            }
            Err(e) => {
                metric_inc!(BUS_CONNECT_ATTEMPTS, &["failed"]);
                if attempt >= attempts {
                    return Err(e);
                }
                let delay = config.backoff(attempt);
                warn!(
                    attempt,
                    attempts,
                    retry_in = ?delay,
                    error = %e,
                    "Broker connection failed"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// The bridge process.
pub struct BridgeRuntime {
    service: DashboardBridgeService,
    offline: bool,
}

impl BridgeRuntime {
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        let service =
            DashboardBridgeService::new(config.bridge).context("Invalid bridge configuration")?;
        Ok(Self {
            service,
            offline: config.offline,
        })
    }

    /// Connect to the configured broker.
    pub async fn connect(&self) -> Result<Arc<dyn TopicBus>> {
        if self.offline {
            warn!("Running offline: using the in-process broker");
            return Ok(Arc::new(InMemoryBroker::new().connect()));
        }

        let broker = &self.service.config().broker;
        let endpoint = broker.endpoint();
        info!(endpoint = %redact_endpoint(&endpoint), "Connecting to broker");
        let connection = connect_with_retry(broker, || AmqpConnection::connect(&endpoint))
            .await
            .with_context(|| {
                format!(
                    "Broker unreachable after {} attempts",
                    broker.connect_attempts
                )
            })?;
        Ok(Arc::new(connection))
    }

    /// Connect and start serving.
    pub async fn start(&self) -> Result<RunningBridge> {
        info!("===========================================");
        info!("  Mascoord Dashboard Bridge v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let bus = self.connect().await?;
        let running = self
            .service
            .start(bus)
            .await
            .context("Failed to start dashboard bridge")?;

        info!(
            ws = %running.ws_addr(),
            admin = ?running.admin_addr(),
            domain = %self.service.config().bus.domain,
            "Bridge is running"
        );
        Ok(running)
    }

    /// Run until `signal` resolves, then shut down gracefully.
    pub async fn run_until<S: Future<Output = ()>>(self, signal: S) -> Result<()> {
        let running = self.start().await?;
        signal.await;
        info!("Initiating graceful shutdown...");
        running.shutdown().await;
        info!("Shutdown complete");
        Ok(())
    }
}
