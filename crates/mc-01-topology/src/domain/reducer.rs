//! # Topology Reducer
//!
//! One transition per event kind:
//!
//! | Event | Precondition | Effect |
//! |---|---|---|
//! | `AGENT_REGISTRATION` | node absent | append node |
//! | `AGENT_REGISTRATION` | node present | none |
//! | `AGENT_SHUTDOWN` | node present | remove that node only |
//! | `AGENT_CONNECTION_MSG` | no edge keyed `<parent>-<child>` | append edge |
//! | `AGENT_DISCONNECTION` | - | remove `(node1, node2)` and `(node2, node1)` |
//! | `SAVED_SIMULATIONS_REPORT` | - | replace simulation list |
//! | `DCOP_ALGORITHM` | - | record algorithm |
//!
//! Agent reports never touch the graph.
//!
//! Shutdown does not remove incident edges. Use
//! [`TopologyState::dangling_edges`] to see what that leaves behind.

use shared_types::{AgentId, EdgeId, MonitoringEvent};

use super::state::{Edge, Node, TopologyState};

/// What a single event did to the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    NodeAdded(AgentId),
    NodeAlreadyPresent(AgentId),
    NodeRemoved(AgentId),
    NodeAbsent(AgentId),
    EdgeAdded(EdgeId),
    EdgeAlreadyPresent(EdgeId),
    /// Disconnection outcome; `0` when neither direction existed.
    EdgesRemoved { count: usize },
    SimulationsReplaced { count: usize },
    AlgorithmChanged(String),
    /// Event carries no graph information.
    Unchanged,
}

impl Transition {
    /// Whether the graph (nodes or edges) changed.
    pub fn changed_graph(&self) -> bool {
        matches!(
            self,
            Self::NodeAdded(_)
                | Self::NodeRemoved(_)
                | Self::EdgeAdded(_)
                | Self::EdgesRemoved { count: 1.. }
        )
    }
}

/// New state plus what changed.
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    pub state: TopologyState,
    pub transition: Transition,
}

/// Compute the state after `event`. `state` is left untouched.
pub fn reduce(state: &TopologyState, event: &MonitoringEvent) -> Reduction {
    let (state, transition) = state.clone().apply(event);
    Reduction { state, transition }
}

/// Fold `events` from the empty state.
pub fn replay<'a, I>(events: I) -> TopologyState
where
    I: IntoIterator<Item = &'a MonitoringEvent>,
{
    events
        .into_iter()
        .fold(TopologyState::default(), |state, event| state.apply(event).0)
}

impl TopologyState {
    /// Consume the state and return its successor.
    ///
    /// Same result as [`reduce`] without the copy; the caller gives up the old
    /// state, so nothing observable is mutated.
    #[must_use]
    pub fn apply(mut self, event: &MonitoringEvent) -> (Self, Transition) {
        let transition = match event {
            MonitoringEvent::AgentRegistration(e) => self.register(&e.agent_id),
            MonitoringEvent::AgentShutdown(e) => self.shutdown(&e.agent_id),
            MonitoringEvent::AgentConnection(e) => {
                self.connect(Edge::new(e.parent.clone(), e.child.clone(), e.constraint.clone()))
            }
            MonitoringEvent::AgentDisconnection(e) => {
                self.disconnect(EdgeId::new(e.node1.clone(), e.node2.clone()))
            }
            MonitoringEvent::SavedSimulationsReport(e) => {
                self.simulations = Some(e.simulations.clone());
                Transition::SimulationsReplaced {
                    count: e.simulations.len(),
                }
            }
            MonitoringEvent::DcopAlgorithm(e) => {
                self.dcop_algorithm = Some(e.dcop.clone());
                Transition::AlgorithmChanged(e.dcop.clone())
            }
            MonitoringEvent::AgentStateChanged(_)
            | MonitoringEvent::AgentCpaReport(_)
            | MonitoringEvent::AgentReset(_)
            | MonitoringEvent::AgentReport(_)
            | MonitoringEvent::MetricsReport(_) => Transition::Unchanged,
        };
        (self, transition)
    }

    fn register(&mut self, id: &AgentId) -> Transition {
        if self.contains_node(id) {
            return Transition::NodeAlreadyPresent(id.clone());
        }
        self.nodes.push(Node::for_agent(id.clone()));
        Transition::NodeAdded(id.clone())
    }

    fn shutdown(&mut self, id: &AgentId) -> Transition {
        let before = self.nodes.len();
        self.nodes.retain(|n| &n.id != id);
        if self.nodes.len() < before {
            Transition::NodeRemoved(id.clone())
        } else {
            Transition::NodeAbsent(id.clone())
        }
    }

    fn connect(&mut self, edge: Edge) -> Transition {
        if self.contains_edge(&edge.id) {
            return Transition::EdgeAlreadyPresent(edge.id);
        }
        let id = edge.id.clone();
        self.edges.push(edge);
        Transition::EdgeAdded(id)
    }

    fn disconnect(&mut self, id: EdgeId) -> Transition {
        // The notifier may not know which side opened the connection.
        let reversed = id.reversed();
        let before = self.edges.len();
        self.edges
            .retain(|e| !e.id.same_edge(&id) && !e.id.same_edge(&reversed));
        Transition::EdgesRemoved {
            count: before - self.edges.len(),
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn event() -> impl Strategy<Value = MonitoringEvent> {
        let id = 0i64..6;
        prop_oneof![
            id.clone().prop_map(MonitoringEvent::registration),
            id.clone().prop_map(MonitoringEvent::shutdown),
            (id.clone(), id.clone(), "[a-c]").prop_map(|(p, c, k)| MonitoringEvent::connection(p, c, k)),
            (id.clone(), id).prop_map(|(a, b)| MonitoringEvent::disconnection(a, b)),
        ]
    }

    proptest! {
        #[test]
        fn replay_is_deterministic(events in prop::collection::vec(event(), 0..40)) {
            prop_assert_eq!(replay(&events), replay(&events));
        }

        #[test]
        fn ids_stay_unique(events in prop::collection::vec(event(), 0..40)) {
            let state = replay(&events);
            let nodes: HashSet<_> = state.nodes.iter().map(|n| &n.id).collect();
            let edges: HashSet<_> = state.edges.iter().map(|e| &e.id).collect();
            prop_assert_eq!(nodes.len(), state.nodes.len());
            prop_assert_eq!(edges.len(), state.edges.len());
        }

        #[test]
        fn registration_is_idempotent(events in prop::collection::vec(event(), 0..20), id in 0i64..6) {
            let once = replay(&events).apply(&MonitoringEvent::registration(id)).0;
            let twice = once.clone().apply(&MonitoringEvent::registration(id)).0;
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn disconnect_clears_both_directions(events in prop::collection::vec(event(), 0..30), a in 0i64..6, b in 0i64..6) {
            let state = replay(&events).apply(&MonitoringEvent::disconnection(a, b)).0;
            prop_assert!(!state.contains_edge(&EdgeId::new(a, b)));
            prop_assert!(!state.contains_edge(&EdgeId::new(b, a)));
        }
    }
}
