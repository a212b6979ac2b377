//! # Message Envelope
//!
//! Every message that crosses the bus or the dashboard command channel is a JSON
//! object of the form:
//!
//! ```text
//! { "type": "AGENT_REGISTRATION", "payload": { "agent_id": 3 }, "timestamp": 1700000000.5 }
//! ```
//!
//! The envelope is parsed first; interpreting `type` is a separate step (see
//! [`crate::events::MonitoringEvent::from_envelope`]) so that a malformed message
//! and an unrecognised kind are reported differently.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::EnvelopeError;

/// Channel identifier on which dashboard sessions send commands.
pub const DASHBOARD_COMMAND_CHANNEL: &str = "dashboard-command";

/// Channel identifier on which the bridge broadcasts bus events to sessions.
pub const PUBLISH_EVENT_CHANNEL: &str = "publish-event";

/// Wire envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Kind tag, e.g. `AGENT_REGISTRATION`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Kind-specific fields.
    #[serde(default)]
    pub payload: Map<String, Value>,
    /// Producer clock (UNIX seconds). Carried, never interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            kind: kind.into(),
            payload,
            timestamp: None,
        }
    }

    /// Parse an envelope from raw bus bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        serde_json::from_slice(bytes).map_err(|e| EnvelopeError::Malformed(e.to_string()))
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, EnvelopeError> {
        serde_json::to_vec(self).map_err(|e| EnvelopeError::Malformed(e.to_string()))
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Names the bridge uses on the topic exchange, derived from the deployment
/// domain exactly the way the simulation derives them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusTopology {
    /// Topic exchange shared by the simulation and the bridge.
    pub exchange: String,
    /// Prefix of every monitoring routing key.
    pub monitoring_prefix: String,
    /// Routing key dashboard commands are published under.
    pub command_routing_key: String,
}

impl BusTopology {
    pub fn for_domain(domain: &str) -> Self {
        Self {
            exchange: format!("{}.ddcop", domain),
            monitoring_prefix: format!("{}.monitoring", domain),
            command_routing_key: format!("{}.command.dashboard", domain),
        }
    }

    /// Binding pattern for the bridge's queue.
    pub fn monitoring_pattern(&self) -> String {
        format!("{}.#", self.monitoring_prefix)
    }
}
