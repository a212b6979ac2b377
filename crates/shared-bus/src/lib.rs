//! # Shared Bus - Topic Bus Adapter
//!
//! Thin client over a topic-based publish/subscribe broker. The simulation and
//! the dashboard bridge meet on one topic exchange; the bridge publishes
//! commands under a fixed routing key and consumes everything under the
//! monitoring prefix.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! connect(endpoint) ──→ TopicBus ──open_channel()──→ BusChannel
//!                          │                            │
//!                          │            declare_exchange / declare_queue
//!                          │            bind_queue / publish / consume
//!                          │                            │
//!                       close()                   DeliveryStream
//! ```
//!
//! There is no ambient connection: whoever needs the bus is handed a
//! [`TopicBus`] or a [`BusChannel`] explicitly.
//!
//! ## Backends
//!
//! - [`AmqpConnection`]: AMQP 0-9-1 (RabbitMQ) via `lapin`.
//! - [`InMemoryBroker`]: process-local broker with the same routing, exclusivity
//!   and acknowledgment semantics. Used by tests and offline runs.
//!
//! ## Delivery Guarantee
//!
//! With `AckMode::auto_ack` the broker considers a message delivered as soon as
//! it is handed to the consumer. A crash between delivery and processing loses
//! the message. This is only acceptable for best-effort telemetry.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapter;
pub mod amqp;
pub mod error;
pub mod memory;
pub mod pattern;

// Re-export main types
pub use adapter::{
    AckMode, BusChannel, Delivery, DeliveryStream, ExchangeKind, ExchangeSpec, QueueName,
    QueueSpec, TopicBus,
};
pub use amqp::{AmqpChannel, AmqpConnection};
pub use error::BusError;
pub use memory::{InMemoryBroker, InMemoryChannel, InMemoryConnection};
pub use pattern::RoutingPattern;
