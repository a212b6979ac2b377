//! The bridge core and its input queue.

pub mod bridge_core;
pub mod input;

pub use bridge_core::{BridgeCore, BroadcastReport, RelayOutcome, RelayReport};
pub use input::{BridgeHandle, BridgeInput, BridgeStatus, MessagePage, Query};
