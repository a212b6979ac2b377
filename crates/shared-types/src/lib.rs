//! # Shared Types Crate
//!
//! Types that cross crate boundaries in the dashboard bridge:
//!
//! - [`Envelope`]: the `{type, payload, timestamp}` wrapper every message on
//!   the bus and on the command channel uses.
//! - [`MonitoringEvent`]: the typed view of an envelope emitted by the
//!   simulation on the monitoring channel.
//! - [`DashboardCommand`]: commands the dashboard sends toward the simulation.
//! - [`BusTopology`]: exchange, routing keys and binding pattern derived from the
//!   deployment domain.
//!
//! ## Design Principles
//!
//! - **Unknown kinds are rejected**: decoding an envelope with an unrecognised
//!   `type` is an error, never a silent no-op.
//! - **Commands are opaque to the bridge**: [`DashboardCommand`] exists for
//!   building commands and labelling logs; relayed bytes are never validated.

pub mod commands;
pub mod entities;
pub mod envelope;
pub mod errors;
pub mod events;

pub use commands::DashboardCommand;
pub use entities::*;
pub use envelope::*;
pub use errors::*;
pub use events::*;
