//! Graph state held by the reducer.

use serde::{Serialize, Serializer};
use serde_json::Value;
use shared_types::{AgentId, EdgeId, SavedSimulation};

/// A simulated agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: AgentId,
    pub label: String,
    pub title: String,
}

impl Node {
    pub fn for_agent(id: AgentId) -> Self {
        Self {
            label: format!("Agent {}", id),
            title: String::new(),
            id,
        }
    }
}

/// A directed relationship between two agents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    /// Serialised as `"<from>-<to>"`.
    #[serde(serialize_with = "edge_key")]
    pub id: EdgeId,
    pub from: AgentId,
    pub to: AgentId,
    pub constraint: Value,
}

impl Edge {
    pub fn new(from: AgentId, to: AgentId, constraint: Value) -> Self {
        Self {
            id: EdgeId::new(from.clone(), to.clone()),
            from,
            to,
            constraint,
        }
    }
}

fn edge_key<S: Serializer>(id: &EdgeId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(id)
}

/// Everything the dashboard knows about the running simulation.
///
/// `nodes` and `edges` form the graph and keep insertion order. The saved
/// simulation list and the algorithm name are tracked alongside it but are
/// never touched by graph transitions.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TopologyState {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    /// `None` until the factory first reports its saved simulations.
    pub simulations: Option<Vec<SavedSimulation>>,
    pub dcop_algorithm: Option<String>,
}

impl TopologyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &AgentId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn contains_node(&self, id: &AgentId) -> bool {
        self.node(id).is_some()
    }

    /// The edge keyed like `id`, if any.
    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id.same_edge(id))
    }

    pub fn contains_edge(&self, id: &EdgeId) -> bool {
        self.edge(id).is_some()
    }

    /// Edges with at least one endpoint that is no longer a node.
    ///
    /// Shutting an agent down leaves its edges in place, so these accumulate
    /// whenever an agent leaves before its connections are torn down.
    pub fn dangling_edges(&self) -> Vec<&Edge> {
        self.edges
            .iter()
            .filter(|e| !self.contains_node(&e.from) || !self.contains_node(&e.to))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}
