//! Bridge error types.
//!
//! Failures are contained where they happen. Only startup can leave the bridge
//! degraded (no event path, or no bus at all); nothing here is allowed to take
//! the process down once it is serving sessions.

use shared_bus::BusError;
use shared_types::EnvelopeError;
use thiserror::Error;

use super::config::ConfigError;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Broker unreachable.
    #[error("bus connection failed: {0}")]
    Connection(#[source] BusError),

    /// Exchange/queue/consumer setup failed; the event path is disabled.
    #[error("bus channel setup failed: {0}")]
    Channel(#[source] BusError),

    /// A bus message that is not an acceptable envelope.
    #[error("envelope rejected: {0}")]
    Parse(#[from] EnvelopeError),

    /// Relaying a command to the bus failed.
    #[error("command publish failed: {0}")]
    Publish(#[source] BusError),

    /// No bus channel is available for commands.
    #[error("command path unavailable")]
    CommandPathUnavailable,

    /// The core task has stopped; its inputs are no longer read.
    #[error("bridge core stopped")]
    CoreStopped,

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("server I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a frame did not reach a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionSendError {
    /// Outbox full; this frame is dropped for this session only.
    #[error("session outbox full")]
    Lagging,
    /// Session went away; it is removed from the fan-out set.
    #[error("session closed")]
    Closed,
    /// Socket write exceeded the send timeout; the session is closed.
    #[error("socket send timed out")]
    Timeout,
}

impl SessionSendError {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Lagging => "lagging",
            Self::Closed => "closed",
            Self::Timeout => "timeout",
        }
    }
}
