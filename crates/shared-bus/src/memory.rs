//! # In-Memory Broker
//!
//! A process-local stand-in for an AMQP broker. Routing follows topic-exchange
//! rules, exclusive queues belong to the connection that declared them, an
//! exclusive consumer locks its queue, and `exclude_local` filters out messages
//! published on the consumer's own connection.
//!
//! Acknowledgments are not tracked: every delivery is final once handed over.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, trace};

use crate::adapter::{
    AckMode, BusChannel, Delivery, DeliveryStream, ExchangeKind, ExchangeSpec, QueueName,
    QueueSpec, TopicBus,
};
use crate::error::BusError;
use crate::pattern::RoutingPattern;

type ConnectionId = u64;

#[derive(Debug, Clone)]
struct QueuedMessage {
    exchange: String,
    routing_key: String,
    body: Vec<u8>,
    publisher: ConnectionId,
}

struct Binding {
    queue: String,
    pattern: RoutingPattern,
}

struct Exchange {
    spec: ExchangeSpec,
    bindings: Vec<Binding>,
}

impl Exchange {
    fn routes(&self, binding: &Binding, routing_key: &str) -> bool {
        match self.spec.kind {
            ExchangeKind::Topic => binding.pattern.matches(routing_key),
            ExchangeKind::Direct => binding.pattern.as_str() == routing_key,
            ExchangeKind::Fanout => true,
        }
    }
}

struct Queue {
    owner: Option<ConnectionId>,
    sender: mpsc::UnboundedSender<QueuedMessage>,
    /// Taken by the first consumer.
    receiver: Option<mpsc::UnboundedReceiver<QueuedMessage>>,
}

#[derive(Default)]
struct BrokerState {
    exchanges: HashMap<String, Exchange>,
    queues: HashMap<String, Queue>,
    generated_names: u64,
}

/// Shared broker state. Cheap to clone; every clone is the same broker.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    next_connection: Arc<AtomicU64>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new connection. Never fails.
    pub fn connect(&self) -> InMemoryConnection {
        let id = self.next_connection.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(connection = id, "In-memory bus connection opened");
        InMemoryConnection {
            broker: self.clone(),
            id,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn has_exchange(&self, name: &str) -> bool {
        self.state.lock().exchanges.contains_key(name)
    }

    pub fn queue_count(&self) -> usize {
        self.state.lock().queues.len()
    }

    fn publish_from(
        &self,
        publisher: ConnectionId,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
    ) -> Result<usize, BusError> {
        let state = self.state.lock();
        let message = QueuedMessage {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            body: body.to_vec(),
            publisher,
        };

        // Default exchange: routing key names the queue directly.
        if exchange.is_empty() {
            return Ok(match state.queues.get(routing_key) {
                Some(queue) => usize::from(queue.sender.send(message).is_ok()),
                None => 0,
            });
        }

        let ex = state.exchanges.get(exchange).ok_or_else(|| BusError::Publish {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            reason: "NOT_FOUND - no exchange".to_string(),
        })?;

        let mut routed = 0;
        for binding in ex.bindings.iter().filter(|b| ex.routes(b, routing_key)) {
            if let Some(queue) = state.queues.get(&binding.queue) {
                if queue.sender.send(message.clone()).is_ok() {
                    routed += 1;
                }
            }
        }
        trace!(exchange, routing_key, routed, "In-memory publish");
        Ok(routed)
    }

    fn drop_connection(&self, id: ConnectionId) {
        let mut state = self.state.lock();
        let owned: Vec<String> = state
            .queues
            .iter()
            .filter(|(_, q)| q.owner == Some(id))
            .map(|(name, _)| name.clone())
            .collect();
        for name in &owned {
            state.queues.remove(name);
        }
        for exchange in state.exchanges.values_mut() {
            exchange.bindings.retain(|b| !owned.contains(&b.queue));
        }
        debug!(connection = id, queues_deleted = owned.len(), "In-memory bus connection closed");
    }
}

/// One connection to an [`InMemoryBroker`].
pub struct InMemoryConnection {
    broker: InMemoryBroker,
    id: ConnectionId,
    closed: Arc<AtomicBool>,
}

impl InMemoryConnection {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Concrete channel, for callers that do not need a trait object.
    pub fn channel(&self) -> Result<InMemoryChannel, BusError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BusError::Closed);
        }
        Ok(InMemoryChannel {
            broker: self.broker.clone(),
            connection: self.id,
            closed: self.closed.clone(),
        })
    }
}

#[async_trait]
impl TopicBus for InMemoryConnection {
    async fn open_channel(&self) -> Result<Arc<dyn BusChannel>, BusError> {
        Ok(Arc::new(self.channel()?))
    }

    async fn close(&self) -> Result<(), BusError> {
        self.shut();
        Ok(())
    }
}

impl InMemoryConnection {
    fn shut(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.broker.drop_connection(self.id);
        }
    }
}

/// Dropping without `close` deletes the connection's exclusive queues and
/// closes its channels.
impl Drop for InMemoryConnection {
    fn drop(&mut self) {
        self.shut();
    }
}

/// A channel on an [`InMemoryConnection`].
#[derive(Clone)]
pub struct InMemoryChannel {
    broker: InMemoryBroker,
    connection: ConnectionId,
    closed: Arc<AtomicBool>,
}

impl InMemoryChannel {
    fn ensure_open(&self) -> Result<(), BusError> {
        if self.closed.load(Ordering::Acquire) {
            Err(BusError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BusChannel for InMemoryChannel {
    async fn declare_exchange(&self, name: &str, spec: ExchangeSpec) -> Result<(), BusError> {
        self.ensure_open()?;
        let mut state = self.broker.state.lock();
        match state.exchanges.get(name) {
            Some(existing) if existing.spec != spec => Err(BusError::Channel(format!(
                "PRECONDITION_FAILED - inequivalent arg for exchange '{name}'"
            ))),
            Some(_) => Ok(()),
            None => {
                state.exchanges.insert(
                    name.to_string(),
                    Exchange {
                        spec,
                        bindings: Vec::new(),
                    },
                );
                Ok(())
            }
        }
    }

    async fn declare_queue(&self, spec: QueueSpec) -> Result<QueueName, BusError> {
        self.ensure_open()?;
        let mut state = self.broker.state.lock();
        let name = match spec.name {
            Some(name) => name,
            None => {
                state.generated_names += 1;
                format!("amq.gen-{}-{}", self.connection, state.generated_names)
            }
        };

        if let Some(existing) = state.queues.get(&name) {
            return match existing.owner {
                Some(owner) if owner != self.connection => Err(BusError::Channel(format!(
                    "RESOURCE_LOCKED - queue '{name}' is exclusive to another connection"
                ))),
                _ => Ok(QueueName::new(name)),
            };
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        state.queues.insert(
            name.clone(),
            Queue {
                owner: spec.exclusive.then_some(self.connection),
                sender,
                receiver: Some(receiver),
            },
        );
        Ok(QueueName::new(name))
    }

    async fn bind_queue(
        &self,
        queue: &QueueName,
        exchange: &str,
        pattern: &RoutingPattern,
    ) -> Result<(), BusError> {
        self.ensure_open()?;
        let mut state = self.broker.state.lock();
        if !state.queues.contains_key(queue.as_str()) {
            return Err(BusError::Channel(format!("NOT_FOUND - no queue '{queue}'")));
        }
        let ex = state
            .exchanges
            .get_mut(exchange)
            .ok_or_else(|| BusError::Channel(format!("NOT_FOUND - no exchange '{exchange}'")))?;
        let duplicate = ex
            .bindings
            .iter()
            .any(|b| b.queue == queue.as_str() && &b.pattern == pattern);
        if !duplicate {
            ex.bindings.push(Binding {
                queue: queue.as_str().to_string(),
                pattern: pattern.clone(),
            });
        }
        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
    ) -> Result<(), BusError> {
        self.ensure_open()?;
        self.broker
            .publish_from(self.connection, exchange, routing_key, body)
            .map(|_| ())
    }

    async fn consume(&self, queue: &QueueName, mode: AckMode) -> Result<DeliveryStream, BusError> {
        self.ensure_open()?;
        let receiver = {
            let mut state = self.broker.state.lock();
            let q = state
                .queues
                .get_mut(queue.as_str())
                .ok_or_else(|| BusError::Consume(format!("NOT_FOUND - no queue '{queue}'")))?;
            q.receiver.take().ok_or_else(|| {
                BusError::Consume(format!("ACCESS_REFUSED - queue '{queue}' already has a consumer"))
            })?
        };

        let own = self.connection;
        let exclude_local = mode.exclude_local;
        let stream = UnboundedReceiverStream::new(receiver).filter_map(move |m| async move {
            if exclude_local && m.publisher == own {
                None
            } else {
                Some(Ok(Delivery::new(m.exchange, m.routing_key, m.body)))
            }
        });
        Ok(Box::pin(stream))
    }
}
