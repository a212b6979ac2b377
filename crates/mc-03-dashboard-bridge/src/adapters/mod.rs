//! Bus-facing adapters for both directions of the bridge.

pub mod bus_subscriber;
pub mod command_publisher;

pub use bus_subscriber::{forward_deliveries, subscribe_monitoring};
pub use command_publisher::CommandPublisher;
