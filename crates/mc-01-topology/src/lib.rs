//! # MC-01 Topology
//!
//! Rebuilds the live agent graph from the simulation's monitoring events.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): pure data and transitions, no I/O
//!   - `TopologyState`: nodes, edges, saved simulations, active algorithm
//!   - `reduce`: one transition per event kind
//!
//! The reducer is a sequential fold. Events arrive from a single bus consumer
//! in receipt order, so no locking is involved anywhere in this crate.
//!
//! ## Invariants
//!
//! - **No duplicate nodes**: registering an agent twice yields one node.
//! - **No duplicate edges**: an edge id is the ordered `(parent, child)` pair.
//! - **Purity**: `reduce` never mutates its input state; replaying the same
//!   ordered events from empty always produces the same state.
//!
//! ## Usage Example
//!
//! ```
//! use mc_01_topology::{replay, TopologyState};
//! use shared_types::MonitoringEvent;
//!
//! let state = replay(&[
//!     MonitoringEvent::registration(1),
//!     MonitoringEvent::registration(2),
//!     MonitoringEvent::connection(1, 2, "c1"),
//! ]);
//! assert_eq!(state.nodes.len(), 2);
//! assert_eq!(state.edges.len(), 1);
//! # let _ = TopologyState::default();
//! ```

pub mod domain;

pub use domain::*;
