//! # Bus Adapter Ports
//!
//! Backend-neutral traits and option types for the topic bus. The bridge only
//! ever talks to these; `amqp` and `memory` implement them.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;

use crate::error::BusError;
use crate::pattern::RoutingPattern;

// =============================================================================
// OPTIONS
// =============================================================================

/// Exchange routing discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeKind {
    Topic,
    Direct,
    Fanout,
}

/// Options for `declare_exchange`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeSpec {
    pub kind: ExchangeKind,
    /// Survive a broker restart.
    pub durable: bool,
}

impl Default for ExchangeSpec {
    /// Non-durable topic exchange, matching what the simulation agents declare.
    fn default() -> Self {
        Self {
            kind: ExchangeKind::Topic,
            durable: false,
        }
    }
}

/// Options for `declare_queue`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueueSpec {
    /// `None` asks the broker to generate a unique name.
    pub name: Option<String>,
    /// Owned by the declaring connection and deleted when it closes.
    pub exclusive: bool,
    pub durable: bool,
}

impl QueueSpec {
    /// Server-named, exclusive, non-durable queue.
    pub fn exclusive_server_named() -> Self {
        Self {
            name: None,
            exclusive: true,
            durable: false,
        }
    }
}

/// Options for `consume`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckMode {
    /// Deliveries count as acknowledged once handed over.
    pub auto_ack: bool,
    /// No other consumer may attach to the queue.
    pub exclusive: bool,
    /// Drop messages published on this same connection.
    pub exclude_local: bool,
}

impl Default for AckMode {
    fn default() -> Self {
        Self {
            auto_ack: true,
            exclusive: true,
            exclude_local: true,
        }
    }
}

/// Name of a declared queue, as assigned by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueName(String);

impl QueueName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// DELIVERIES
// =============================================================================

pub(crate) enum Acker {
    /// Auto-acked or in-memory delivery; nothing to send back.
    Noop,
    Amqp(lapin::acker::Acker),
}

/// A message handed to a consumer.
pub struct Delivery {
    pub exchange: String,
    pub routing_key: String,
    pub body: Vec<u8>,
    pub(crate) acker: Acker,
}

impl Delivery {
    pub(crate) fn new(
        exchange: impl Into<String>,
        routing_key: impl Into<String>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            body,
            acker: Acker::Noop,
        }
    }

    /// Acknowledge a delivery consumed with `auto_ack: false`.
    ///
    /// A no-op for auto-acked deliveries.
    pub async fn ack(&self) -> Result<(), BusError> {
        match &self.acker {
            Acker::Noop => Ok(()),
            Acker::Amqp(acker) => acker
                .ack(lapin::options::BasicAckOptions::default())
                .await
                .map(|_| ())
                .map_err(|e| BusError::Consume(e.to_string())),
        }
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("exchange", &self.exchange)
            .field("routing_key", &self.routing_key)
            .field("body_len", &self.body.len())
            .finish()
    }
}

/// Ordered stream of deliveries from one consumer. Ends when the consumer is
/// cancelled or the connection closes.
pub type DeliveryStream = Pin<Box<dyn Stream<Item = Result<Delivery, BusError>> + Send>>;

// =============================================================================
// PORTS
// =============================================================================

/// An open broker connection.
#[async_trait]
pub trait TopicBus: Send + Sync {
    /// Open a logical channel on this connection.
    async fn open_channel(&self) -> Result<Arc<dyn BusChannel>, BusError>;

    /// Close the connection. Exclusive queues it owns go away with it.
    async fn close(&self) -> Result<(), BusError>;
}

/// A logical channel: all exchange, queue, publish and consume operations.
#[async_trait]
pub trait BusChannel: Send + Sync {
    /// Idempotent when re-declared with the same options.
    async fn declare_exchange(&self, name: &str, spec: ExchangeSpec) -> Result<(), BusError>;

    async fn declare_queue(&self, spec: QueueSpec) -> Result<QueueName, BusError>;

    async fn bind_queue(
        &self,
        queue: &QueueName,
        exchange: &str,
        pattern: &RoutingPattern,
    ) -> Result<(), BusError>;

    /// Fire-and-forget publish. Unroutable messages are dropped by the broker.
    async fn publish(&self, exchange: &str, routing_key: &str, body: &[u8])
        -> Result<(), BusError>;

    async fn consume(&self, queue: &QueueName, mode: AckMode) -> Result<DeliveryStream, BusError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_monitoring_consumer() {
        let mode = AckMode::default();
        assert!(mode.auto_ack && mode.exclusive && mode.exclude_local);

        let spec = ExchangeSpec::default();
        assert_eq!(spec.kind, ExchangeKind::Topic);
        assert!(!spec.durable);

        let queue = QueueSpec::exclusive_server_named();
        assert!(queue.name.is_none());
        assert!(queue.exclusive);
    }

    #[tokio::test]
    async fn test_noop_ack_succeeds() {
        let delivery = Delivery::new("ex", "key", b"{}".to_vec());
        assert!(delivery.ack().await.is_ok());
        assert!(format!("{delivery:?}").contains("body_len"));
    }
}
