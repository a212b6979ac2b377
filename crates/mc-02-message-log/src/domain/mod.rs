pub mod log;
pub mod quarantine;

pub use log::*;
pub use quarantine::*;

/// Default number of events retained by [`MessageLog`].
pub const DEFAULT_LOG_CAPACITY: usize = 10_000;

/// Default number of rejected messages retained by [`Quarantine`].
pub const DEFAULT_QUARANTINE_CAPACITY: usize = 256;
