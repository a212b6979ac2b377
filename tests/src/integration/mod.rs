//! Integration flows across the bus, the bridge core and the session server.

mod command_relay;
mod event_flows;
mod websocket_e2e;
