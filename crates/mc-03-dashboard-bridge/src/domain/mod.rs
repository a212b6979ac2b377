//! # Domain Layer - Dashboard Bridge
//!
//! - `config`: BridgeConfig and its sections, with validation
//! - `error`: BridgeError, SessionSendError
//! - `frames`: WebSocket frame parsing and the broadcast frame
//! - `session`: SessionId, Session, SessionInfo

pub mod config;
pub mod error;
pub mod frames;
pub mod session;

pub use config::*;
pub use error::*;
pub use frames::*;
pub use session::*;
