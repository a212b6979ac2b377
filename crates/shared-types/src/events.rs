//! # Monitoring Events
//!
//! Typed view of the envelopes the simulation publishes on its monitoring
//! channel. Each kind carries its own payload record; unknown fields in a
//! payload are ignored because producers attach extra context (for instance
//! `agent_id` on connection messages).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::entities::{AgentId, SavedSimulation};
use crate::envelope::Envelope;
use crate::errors::EnvelopeError;

/// Every monitoring kind the simulation emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    #[serde(alias = "AGENT_REGISTRATION_DASHBOARD")]
    AgentRegistration,
    #[serde(rename = "AGENT_CONNECTION_MSG")]
    AgentConnection,
    AgentShutdown,
    AgentDisconnection,
    SavedSimulationsReport,
    DcopAlgorithm,
    AgentStateChanged,
    AgentCpaReport,
    AgentReset,
    AgentReport,
    MetricsReport,
}

impl EventKind {
    pub const ALL: [EventKind; 11] = [
        Self::AgentRegistration,
        Self::AgentConnection,
        Self::AgentShutdown,
        Self::AgentDisconnection,
        Self::SavedSimulationsReport,
        Self::DcopAlgorithm,
        Self::AgentStateChanged,
        Self::AgentCpaReport,
        Self::AgentReset,
        Self::AgentReport,
        Self::MetricsReport,
    ];

    /// Wire tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AgentRegistration => "AGENT_REGISTRATION",
            Self::AgentConnection => "AGENT_CONNECTION_MSG",
            Self::AgentShutdown => "AGENT_SHUTDOWN",
            Self::AgentDisconnection => "AGENT_DISCONNECTION",
            Self::SavedSimulationsReport => "SAVED_SIMULATIONS_REPORT",
            Self::DcopAlgorithm => "DCOP_ALGORITHM",
            Self::AgentStateChanged => "AGENT_STATE_CHANGED",
            Self::AgentCpaReport => "AGENT_CPA_REPORT",
            Self::AgentReset => "AGENT_RESET",
            Self::AgentReport => "AGENT_REPORT",
            Self::MetricsReport => "METRICS_REPORT",
        }
    }

    /// Whether the kind can change the node/edge graph.
    pub fn is_topological(&self) -> bool {
        matches!(
            self,
            Self::AgentRegistration
                | Self::AgentConnection
                | Self::AgentShutdown
                | Self::AgentDisconnection
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "AGENT_REGISTRATION_DASHBOARD" {
            return Ok(Self::AgentRegistration);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| EnvelopeError::UnknownKind(s.to_string()))
    }
}

// =============================================================================
// PAYLOAD RECORDS
// =============================================================================

/// An agent joined the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRegistration {
    pub agent_id: AgentId,
}

/// A parent/child relationship was formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConnection {
    pub parent: AgentId,
    pub child: AgentId,
    /// Opaque relationship attribute.
    #[serde(default)]
    pub constraint: Value,
}

/// An agent left the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentShutdown {
    pub agent_id: AgentId,
}

/// A relationship between two agents ended. The notifier does not know which
/// side created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDisconnection {
    pub node1: AgentId,
    pub node2: AgentId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSimulationsReport {
    pub simulations: Vec<SavedSimulation>,
}

/// Which DCOP algorithm the factory is running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcopAlgorithmReport {
    pub dcop: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStateChanged {
    pub agent_id: AgentId,
    #[serde(default)]
    pub state: Value,
}

/// Current partial assignment reported by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentCpaReport {
    pub agent_id: AgentId,
    #[serde(default)]
    pub cpa: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Full agent snapshot sent in answer to `REQUEST_AGENT_REPORT`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReport {
    pub agent_id: AgentId,
    #[serde(flatten)]
    pub snapshot: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    #[serde(flatten)]
    pub metrics: Map<String, Value>,
}

// =============================================================================
// TAGGED UNION
// =============================================================================

/// A decoded monitoring event.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitoringEvent {
    AgentRegistration(AgentRegistration),
    AgentConnection(AgentConnection),
    AgentShutdown(AgentShutdown),
    AgentDisconnection(AgentDisconnection),
    SavedSimulationsReport(SavedSimulationsReport),
    DcopAlgorithm(DcopAlgorithmReport),
    AgentStateChanged(AgentStateChanged),
    AgentCpaReport(AgentCpaReport),
    AgentReset(AgentReset),
    AgentReport(AgentReport),
    MetricsReport(MetricsReport),
}

impl MonitoringEvent {
    /// Decode the typed event carried by `envelope`.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, EnvelopeError> {
        let kind: EventKind = envelope.kind.parse()?;
        let event = match kind {
            EventKind::AgentRegistration => Self::AgentRegistration(decode(kind, envelope)?),
            EventKind::AgentConnection => Self::AgentConnection(decode(kind, envelope)?),
            EventKind::AgentShutdown => Self::AgentShutdown(decode(kind, envelope)?),
            EventKind::AgentDisconnection => Self::AgentDisconnection(decode(kind, envelope)?),
            EventKind::SavedSimulationsReport => {
                Self::SavedSimulationsReport(decode(kind, envelope)?)
            }
            EventKind::DcopAlgorithm => Self::DcopAlgorithm(decode(kind, envelope)?),
            EventKind::AgentStateChanged => Self::AgentStateChanged(decode(kind, envelope)?),
            EventKind::AgentCpaReport => Self::AgentCpaReport(decode(kind, envelope)?),
            EventKind::AgentReset => Self::AgentReset(decode(kind, envelope)?),
            EventKind::AgentReport => Self::AgentReport(decode(kind, envelope)?),
            EventKind::MetricsReport => Self::MetricsReport(decode(kind, envelope)?),
        };
        Ok(event)
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::AgentRegistration(_) => EventKind::AgentRegistration,
            Self::AgentConnection(_) => EventKind::AgentConnection,
            Self::AgentShutdown(_) => EventKind::AgentShutdown,
            Self::AgentDisconnection(_) => EventKind::AgentDisconnection,
            Self::SavedSimulationsReport(_) => EventKind::SavedSimulationsReport,
            Self::DcopAlgorithm(_) => EventKind::DcopAlgorithm,
            Self::AgentStateChanged(_) => EventKind::AgentStateChanged,
            Self::AgentCpaReport(_) => EventKind::AgentCpaReport,
            Self::AgentReset(_) => EventKind::AgentReset,
            Self::AgentReport(_) => EventKind::AgentReport,
            Self::MetricsReport(_) => EventKind::MetricsReport,
        }
    }

    /// Build the envelope a producer would publish for this event.
    pub fn to_envelope(&self) -> Envelope {
        let payload = match self {
            Self::AgentRegistration(p) => encode(p),
            Self::AgentConnection(p) => encode(p),
            Self::AgentShutdown(p) => encode(p),
            Self::AgentDisconnection(p) => encode(p),
            Self::SavedSimulationsReport(p) => encode(p),
            Self::DcopAlgorithm(p) => encode(p),
            Self::AgentStateChanged(p) => encode(p),
            Self::AgentCpaReport(p) => encode(p),
            Self::AgentReset(p) => encode(p),
            Self::AgentReport(p) => encode(p),
            Self::MetricsReport(p) => encode(p),
        };
        Envelope::new(self.kind().as_str(), payload)
    }

    // Constructors for the topology-changing kinds.

    pub fn registration(agent_id: impl Into<AgentId>) -> Self {
        Self::AgentRegistration(AgentRegistration {
            agent_id: agent_id.into(),
        })
    }

    pub fn shutdown(agent_id: impl Into<AgentId>) -> Self {
        Self::AgentShutdown(AgentShutdown {
            agent_id: agent_id.into(),
        })
    }

    pub fn connection(
        parent: impl Into<AgentId>,
        child: impl Into<AgentId>,
        constraint: impl Into<Value>,
    ) -> Self {
        Self::AgentConnection(AgentConnection {
            parent: parent.into(),
            child: child.into(),
            constraint: constraint.into(),
        })
    }

    pub fn disconnection(node1: impl Into<AgentId>, node2: impl Into<AgentId>) -> Self {
        Self::AgentDisconnection(AgentDisconnection {
            node1: node1.into(),
            node2: node2.into(),
        })
    }
}

fn decode<T: DeserializeOwned>(kind: EventKind, envelope: &Envelope) -> Result<T, EnvelopeError> {
    serde_json::from_value(Value::Object(envelope.payload.clone())).map_err(|e| {
        EnvelopeError::InvalidPayload {
            kind: kind.as_str().to_string(),
            reason: e.to_string(),
        }
    })
}

fn encode<T: Serialize>(record: &T) -> Map<String, Value> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
