//! # Test Fixtures
//!
//! A simulated agent side of the bus and a bridge started on ephemeral ports.

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use mc_03_dashboard_bridge::{BridgeConfig, DashboardBridgeService, RunningBridge};
use shared_bus::{
    AckMode, BusChannel, DeliveryStream, ExchangeSpec, InMemoryBroker, InMemoryConnection,
    QueueSpec, RoutingPattern, TopicBus,
};
use shared_types::{BusTopology, MonitoringEvent};

/// Domain used by every integration test.
pub const DOMAIN: &str = "itest";

pub fn topology() -> BusTopology {
    BusTopology::for_domain(DOMAIN)
}

/// Bridge configuration bound to localhost on ephemeral ports.
pub fn bridge_config() -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.bus.domain = DOMAIN.to_string();
    config.websocket.host = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.websocket.port = 0;
    config.admin.port = 0;
    config
}

pub async fn start_bridge(broker: &InMemoryBroker) -> RunningBridge {
    start_bridge_with(broker, bridge_config()).await
}

pub async fn start_bridge_with(broker: &InMemoryBroker, config: BridgeConfig) -> RunningBridge {
    let service = DashboardBridgeService::new(config).unwrap();
    service.start(Arc::new(broker.connect())).await.unwrap()
}

/// The simulation's side of the exchange.
pub struct SimulatedAgent {
    connection: InMemoryConnection,
    channel: Arc<dyn BusChannel>,
    topology: BusTopology,
}

impl SimulatedAgent {
    pub async fn connect(broker: &InMemoryBroker) -> Self {
        let connection = broker.connect();
        let channel = connection.open_channel().await.unwrap();
        let topology = topology();
        channel
            .declare_exchange(&topology.exchange, ExchangeSpec::default())
            .await
            .unwrap();
        Self {
            connection,
            channel,
            topology,
        }
    }

    /// Publish under `<domain>.monitoring.<suffix>`.
    pub async fn publish_raw(&self, suffix: &str, body: &[u8]) {
        let key = format!("{}.{}", self.topology.monitoring_prefix, suffix);
        self.channel
            .publish(&self.topology.exchange, &key, body)
            .await
            .unwrap();
    }

    pub async fn publish(&self, event: &MonitoringEvent) {
        self.publish_raw("agent", &encode(event)).await;
    }

    /// Consume everything published under the dashboard command key.
    pub async fn commands(&self) -> DeliveryStream {
        let queue = self
            .channel
            .declare_queue(QueueSpec::exclusive_server_named())
            .await
            .unwrap();
        self.channel
            .bind_queue(
                &queue,
                &self.topology.exchange,
                &RoutingPattern::new(self.topology.command_routing_key.clone()),
            )
            .await
            .unwrap();
        self.channel
            .consume(&queue, AckMode::default())
            .await
            .unwrap()
    }

    pub async fn disconnect(self) {
        self.connection.close().await.unwrap();
    }
}

pub fn encode(event: &MonitoringEvent) -> Vec<u8> {
    event.to_envelope().to_vec().unwrap()
}

/// Poll `check` until it returns `true`, for at most two seconds.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Await `future`, failing the test after two seconds.
pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), future)
        .await
        .expect("timed out")
}
