//! Event path: monitoring deliveries from the exchange into the core.

use futures::StreamExt;
use shared_bus::{
    AckMode, BusChannel, BusError, DeliveryStream, ExchangeSpec, QueueSpec, RoutingPattern,
};
use shared_types::BusTopology;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::pipeline::BridgeHandle;

/// Declare the exchange, bind a private queue to the monitoring pattern and
/// start consuming it.
///
/// The queue is server-named and exclusive, so it disappears with the
/// connection. Consumption is auto-ack, exclusive and no-local.
pub async fn subscribe_monitoring(
    channel: &dyn BusChannel,
    topology: &BusTopology,
) -> Result<DeliveryStream, BusError> {
    channel
        .declare_exchange(&topology.exchange, ExchangeSpec::default())
        .await?;
    let queue = channel
        .declare_queue(QueueSpec::exclusive_server_named())
        .await?;
    let pattern = RoutingPattern::new(topology.monitoring_pattern());
    channel
        .bind_queue(&queue, &topology.exchange, &pattern)
        .await?;
    let stream = channel.consume(&queue, AckMode::default()).await?;

    info!(
        exchange = %topology.exchange,
        queue = %queue,
        pattern = %pattern,
        "Subscribed to monitoring events"
    );
    Ok(stream)
}

/// Hand every delivery to the core until the stream ends, the core stops or
/// shutdown is signalled.
///
/// Waits whenever the core's input buffer is full.
pub async fn forward_deliveries(
    mut deliveries: DeliveryStream,
    core: BridgeHandle,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                debug!("Monitoring forwarder stopping");
                return;
            }
            next = deliveries.next() => match next {
                Some(Ok(delivery)) => {
                    if core.deliver(delivery.routing_key, delivery.body).await.is_err() {
                        debug!("Core stopped; monitoring forwarder exiting");
                        return;
                    }
                }
                Some(Err(BusError::Closed)) | None => {
                    warn!("Monitoring consumer ended; event path disabled");
                    let _ = core.event_path_down("monitoring consumer ended").await;
                    return;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Monitoring delivery failed");
                }
            }
        }
    }
}
