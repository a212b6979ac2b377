//! Command path: session command bytes onto the exchange.

use std::sync::Arc;

use shared_bus::BusChannel;
use shared_types::BusTopology;
use tracing::debug;

use crate::domain::BridgeError;

/// Publishes dashboard commands under the command routing key.
///
/// Payloads are never inspected or re-encoded.
pub struct CommandPublisher {
    channel: Option<Arc<dyn BusChannel>>,
    exchange: String,
    routing_key: String,
}

impl CommandPublisher {
    pub fn new(channel: Arc<dyn BusChannel>, topology: &BusTopology) -> Self {
        Self {
            channel: Some(channel),
            exchange: topology.exchange.clone(),
            routing_key: topology.command_routing_key.clone(),
        }
    }

    /// A publisher with no channel behind it; every publish fails.
    pub fn unavailable(topology: &BusTopology) -> Self {
        Self {
            channel: None,
            exchange: topology.exchange.clone(),
            routing_key: topology.command_routing_key.clone(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.channel.is_some()
    }

    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    pub async fn publish(&self, body: &[u8]) -> Result<(), BridgeError> {
        let channel = self
            .channel
            .as_ref()
            .ok_or(BridgeError::CommandPathUnavailable)?;
        channel
            .publish(&self.exchange, &self.routing_key, body)
            .await
            .map_err(BridgeError::Publish)?;
        debug!(
            exchange = %self.exchange,
            routing_key = %self.routing_key,
            bytes = body.len(),
            "Command published"
        );
        Ok(())
    }
}
