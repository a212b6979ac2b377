//! # Bus Errors

use thiserror::Error;

/// Errors from bus adapter operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Broker unreachable or handshake rejected.
    #[error("Connection to {endpoint} failed: {reason}")]
    Connection { endpoint: String, reason: String },

    /// Channel open or exchange/queue/binding setup failed.
    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Publish to {exchange} with key {routing_key} failed: {reason}")]
    Publish {
        exchange: String,
        routing_key: String,
        reason: String,
    },

    #[error("Consume failed: {0}")]
    Consume(String),

    /// The connection or channel was closed.
    #[error("Bus connection closed")]
    Closed,
}
