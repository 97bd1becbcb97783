//! The `transport` module is responsible for the network side of the relay.
//!
//! It accepts TCP connections, upgrades them to WebSockets on the configured
//! path, registers each connection with the hub, and runs the two pumps that
//! move frames between the socket and the hub.

pub mod pumps;
pub mod websocket;

pub use websocket::{bind, serve_connection, start_websocket_server};
