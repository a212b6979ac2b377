//! # MC-02 Message Log
//!
//! Record of every envelope the bridge received, decoded or not, addressable by
//! receipt index, plus a quarantine for bus messages it rejected.
//!
//! ## Retention
//!
//! Both buffers are bounded. Appending to a full buffer evicts the oldest
//! entry. Indexes are absolute receipt sequence numbers: they start at 0, are
//! never reused, and an evicted index simply stops resolving.
//!
//! ## Ordering
//!
//! Receipt order, which is not necessarily the order in which the simulation
//! produced the events.

pub mod domain;

pub use domain::*;
