//! # Domain Layer - Topology
//!
//! - `state`: Node, Edge, TopologyState
//! - `reducer`: reduce, replay, Transition

pub mod reducer;
pub mod state;

pub use reducer::*;
pub use state::*;
