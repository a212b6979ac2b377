//! # Mascoord Bridge Test Suite
//!
//! Cross-crate flows driven through the in-process broker.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs          # Simulated agents, bridge startup, polling helpers
//! └── integration/
//!     ├── event_flows.rs   # Bus → core → sessions (fan-out, resilience, ordering)
//!     ├── command_relay.rs # Sessions → bus, bytes unchanged
//!     └── websocket_e2e.rs # Real sockets against a started bridge
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p mc-tests
//! cargo test -p mc-tests integration::event_flows
//!
//! # Benchmarks
//! cargo bench -p mc-tests
//! ```

pub mod fixtures;
pub mod integration;
