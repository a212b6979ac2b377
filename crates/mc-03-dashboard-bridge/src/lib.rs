//! # Dashboard Bridge
//!
//! Connects browser dashboards to a running multi-agent simulation over a
//! topic exchange.
//!
//! ## Paths
//!
//! ```text
//! dashboard ──dashboard-command──→ bridge ──<domain>.command.dashboard──→ exchange
//! dashboard ←──publish-event────── bridge ←──<domain>.monitoring.#─────── exchange
//! ```
//!
//! Commands are relayed byte for byte. Monitoring events are logged, folded
//! into the topology and broadcast to every connected session.
//!
//! ## Architecture
//!
//! - `domain`: configuration, errors, sessions and frame formats
//! - `pipeline`: the [`BridgeCore`] task and the [`BridgeHandle`] used to talk to it
//! - `adapters`: the monitoring subscriber and the command publisher
//! - `ws`: WebSocket session server
//! - `admin`: read-only inspection API and Prometheus metrics
//! - `service`: [`DashboardBridgeService`], which wires everything together
//!
//! ## Servers
//!
//! | Server | Default address |
//! |--------|-----------------|
//! | WebSocket | `0.0.0.0:8000` |
//! | Admin | `127.0.0.1:8081` |

pub mod adapters;
pub mod admin;
pub mod domain;
pub mod pipeline;
pub mod service;
pub mod ws;

pub use domain::{
    BridgeConfig, BridgeError, ConfigError, OutboundFrame, SessionId, SessionInfo,
    SessionSendError,
};
pub use pipeline::{BridgeCore, BridgeHandle, BridgeInput, BridgeStatus, RelayOutcome};
pub use service::{DashboardBridgeService, RunningBridge};
