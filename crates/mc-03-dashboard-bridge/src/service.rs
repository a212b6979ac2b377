//! Dashboard bridge service: wires the bus, the core and both servers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use shared_bus::{BusChannel, BusError, DeliveryStream, ExchangeSpec, TopicBus};
use shared_types::BusTopology;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::adapters::{forward_deliveries, subscribe_monitoring, CommandPublisher};
use crate::admin::build_admin_router;
use crate::domain::{BridgeConfig, BridgeError};
use crate::pipeline::{BridgeCore, BridgeHandle};
use crate::ws::build_ws_router;

/// Dashboard bridge service
pub struct DashboardBridgeService {
    config: BridgeConfig,
}

impl DashboardBridgeService {
    /// Create the service from a validated configuration
    pub fn new(config: BridgeConfig) -> Result<Self, BridgeError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Set up both bus paths, spawn the core and start serving.
    ///
    /// Bus channel failures leave the bridge running in a degraded state;
    /// only a listener that cannot be bound is an error.
    pub async fn start(&self, bus: Arc<dyn TopicBus>) -> Result<RunningBridge, BridgeError> {
        info!("Starting dashboard bridge...");
        let topology = self.config.topology();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut channels = Vec::new();

        let publisher = match open_command_path(bus.as_ref(), &topology).await {
            Ok(channel) => {
                channels.push(Arc::clone(&channel));
                CommandPublisher::new(channel, &topology)
            }
            Err(e) => {
                let e = BridgeError::Channel(e);
                warn!(error = %e, "Command path unavailable");
                CommandPublisher::unavailable(&topology)
            }
        };

        let deliveries = match open_event_path(bus.as_ref(), &topology).await {
            Ok((channel, deliveries)) => {
                channels.push(channel);
                Some(deliveries)
            }
            Err(e) => {
                let e = BridgeError::Channel(e);
                warn!(error = %e, "Event path disabled");
                None
            }
        };

        let (inputs_tx, inputs_rx) = mpsc::channel(self.config.core.input_buffer);
        let handle = BridgeHandle::new(inputs_tx);
        let mut core = BridgeCore::new(&self.config.core, publisher);
        if deliveries.is_none() {
            core = core.without_event_path();
        }

        let mut tasks = vec![tokio::spawn(core.run(inputs_rx, shutdown_rx.clone()))];
        if let Some(deliveries) = deliveries {
            tasks.push(tokio::spawn(forward_deliveries(
                deliveries,
                handle.clone(),
                shutdown_rx.clone(),
            )));
        }

        // Start WebSocket server
        let ws_listener = TcpListener::bind(self.config.ws_addr()).await?;
        let ws_addr = ws_listener.local_addr()?;
        info!(addr = %ws_addr, "Starting WebSocket server");
        let ws_router = build_ws_router(handle.clone(), self.config.websocket.clone())
            .layer(TraceLayer::new_for_http());
        tasks.push(tokio::spawn(serve(
            ws_listener,
            ws_router,
            shutdown_rx.clone(),
            "websocket",
        )));

        // Start Admin server
        let admin_addr = if self.config.admin.enabled {
            let listener = TcpListener::bind(self.config.admin_addr()).await?;
            let addr = listener.local_addr()?;
            info!(addr = %addr, "Starting Admin server");
            let router = build_admin_router(handle.clone(), &self.config.admin)
                .layer(TraceLayer::new_for_http());
            tasks.push(tokio::spawn(serve(listener, router, shutdown_rx, "admin")));
            Some(addr)
        } else {
            None
        };

        info!(
            exchange = %topology.exchange,
            command_routing_key = %topology.command_routing_key,
            "Dashboard bridge started"
        );

        Ok(RunningBridge {
            handle,
            ws_addr,
            admin_addr,
            shutdown: shutdown_tx,
            tasks,
            _channels: channels,
            bus,
        })
    }
}

/// A started bridge. Dropping it without [`RunningBridge::shutdown`] leaves
/// the tasks running until the runtime stops.
pub struct RunningBridge {
    handle: BridgeHandle,
    ws_addr: SocketAddr,
    admin_addr: Option<SocketAddr>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    _channels: Vec<Arc<dyn BusChannel>>,
    bus: Arc<dyn TopicBus>,
}

impl RunningBridge {
    pub fn handle(&self) -> &BridgeHandle {
        &self.handle
    }

    /// Bound WebSocket address (useful when configured with port 0).
    pub fn ws_addr(&self) -> SocketAddr {
        self.ws_addr
    }

    pub fn admin_addr(&self) -> Option<SocketAddr> {
        self.admin_addr
    }

    /// Stop accepting, close every session, then close the bus connection.
    pub async fn shutdown(self) {
        info!("Shutting down dashboard bridge...");
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Bridge task failed");
            }
        }
        if let Err(e) = self.bus.close().await {
            warn!(error = %e, "Bus connection did not close cleanly");
        }
        info!("Dashboard bridge stopped");
    }
}

async fn open_command_path(
    bus: &dyn TopicBus,
    topology: &BusTopology,
) -> Result<Arc<dyn BusChannel>, BusError> {
    let channel = bus.open_channel().await?;
    channel
        .declare_exchange(&topology.exchange, ExchangeSpec::default())
        .await?;
    Ok(channel)
}

async fn open_event_path(
    bus: &dyn TopicBus,
    topology: &BusTopology,
) -> Result<(Arc<dyn BusChannel>, DeliveryStream), BusError> {
    let channel = bus.open_channel().await?;
    let deliveries = subscribe_monitoring(channel.as_ref(), topology).await?;
    Ok((channel, deliveries))
}

async fn serve(
    listener: TcpListener,
    router: Router,
    mut shutdown: watch::Receiver<bool>,
    server: &'static str,
) {
    let result = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await;
    if let Err(e) = result {
        error!(server, error = %e, "Server error");
    }
}
