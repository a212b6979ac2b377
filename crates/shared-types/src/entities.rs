//! # Core Entities
//!
//! Identifiers for agents and the relationships between them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a simulated agent.
///
/// The simulation assigns ids; the bridge treats them as opaque. Both JSON
/// integers and strings are accepted and round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgentId {
    /// Numeric id (what the simulation emits today).
    Number(i64),
    /// Textual id.
    Text(String),
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for AgentId {
    fn from(id: i64) -> Self {
        Self::Number(id)
    }
}

impl From<i32> for AgentId {
    fn from(id: i32) -> Self {
        Self::Number(i64::from(id))
    }
}

impl From<&str> for AgentId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl From<String> for AgentId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

/// A directed edge: the ordered pair `(from, to)`.
///
/// `EdgeId::new(a, b)` and `EdgeId::new(b, a)` are different edges. The
/// dashboard identifies edges by [`EdgeId::key`], so two pairs with the same
/// key (`1`/`"1"`, or `"a-1"`/`"2"` against `"a"`/`"1-2"`) name the same edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId {
    pub from: AgentId,
    pub to: AgentId,
}

impl EdgeId {
    pub fn new(from: impl Into<AgentId>, to: impl Into<AgentId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// `"<from>-<to>"`, the id the dashboard keys edges by.
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Whether both ids name the same dashboard edge.
    pub fn same_edge(&self, other: &EdgeId) -> bool {
        self == other || self.key() == other.key()
    }

    /// The same pair in the opposite direction.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

/// A simulation run saved by the factory and offered for replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSimulation {
    /// Capture date, taken from the file name.
    pub date: String,
    /// File name on the factory side (`<date>.sim`).
    pub filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_id_accepts_numbers_and_strings() {
        let n: AgentId = serde_json::from_str("5").unwrap();
        let s: AgentId = serde_json::from_str("\"a-7\"").unwrap();
        assert_eq!(n, AgentId::Number(5));
        assert_eq!(s, AgentId::Text("a-7".into()));
        assert_eq!(serde_json::to_string(&n).unwrap(), "5");
    }

    #[test]
    fn test_edge_id_is_ordered() {
        let forward = EdgeId::new(1, 2);
        assert_ne!(forward, EdgeId::new(2, 1));
        assert_eq!(forward.reversed(), EdgeId::new(2, 1));
        assert_eq!(forward.to_string(), "1-2");
    }

    #[test]
    fn test_edge_ids_with_equal_keys_are_the_same_edge() {
        assert!(EdgeId::new(1, 2).same_edge(&EdgeId::new("1", "2")));
        assert!(EdgeId::new("a-1", "2").same_edge(&EdgeId::new("a", "1-2")));
        assert!(!EdgeId::new(1, 2).same_edge(&EdgeId::new(2, 1)));
        assert_eq!(EdgeId::new("a", "1-2").key(), "a-1-2");
    }
}
