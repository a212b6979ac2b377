//! # Dashboard Commands
//!
//! Commands a dashboard session sends toward the simulation factory. The
//! bridge relays command bytes untouched; these types are for building
//! commands and for labelling relay logs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entities::AgentId;

/// A command on the `dashboard-command` channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DashboardCommand {
    /// Connectivity probe.
    Test {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    AddAgent { num_agents: u32 },
    RemoveAgent { num_agents: u32 },
    ChangeConstraint { num_agents: u32 },
    /// Ask one agent for an `AGENT_REPORT`.
    RequestAgentReport { agent_id: AgentId },
    SaveSimulation,
    /// Replay a saved simulation; the value is whatever the dashboard selected
    /// from the last `SAVED_SIMULATIONS_REPORT`.
    PlaySimulation { simulation: Value },
    SaveMetrics,
}

impl DashboardCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Test { .. } => "TEST",
            Self::AddAgent { .. } => "ADD_AGENT",
            Self::RemoveAgent { .. } => "REMOVE_AGENT",
            Self::ChangeConstraint { .. } => "CHANGE_CONSTRAINT",
            Self::RequestAgentReport { .. } => "REQUEST_AGENT_REPORT",
            Self::SaveSimulation => "SAVE_SIMULATION",
            Self::PlaySimulation { .. } => "PLAY_SIMULATION",
            Self::SaveMetrics => "SAVE_METRICS",
        }
    }

    pub fn to_vec(&self) -> Vec<u8> {
        // Every variant is a plain struct of JSON-representable fields.
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Best-effort look at the `type` field of arbitrary command bytes.
    ///
    /// Returns `None` for anything that is not a JSON object with a string
    /// `type`. This never rejects a command; it only labels it.
    pub fn peek_kind(bytes: &[u8]) -> Option<String> {
        let value: Value = serde_json::from_slice(bytes).ok()?;
        value.get("type")?.as_str().map(str::to_string)
    }
}
