//! # lanchat
//!
//! `lanchat` is a LAN-local chat relay built with Rust. Browsers connect over
//! WebSockets, and every text or file-link message one of them sends is
//! relayed to all the others. Uploaded files are announced the same way.
//!
//! ## Core Modules
//!
//! - `hub`: the control loop that owns the set of connected clients and fans
//!   messages out, plus the `Envelope` message type.
//! - `client`: the hub's view of one connection and its lifecycle.
//! - `transport`: the WebSocket accept loop and per-connection pumps.
//! - `upload`: the temp upload directory and the bridge that announces
//!   stored files.
//! - `config`: loading server configuration.
//! - `utils`: errors, logging and the shutdown signal.
//!
//! The relay never validates what clients send. Frames are passed on byte
//! for byte; interpreting envelopes is up to the browsers.

pub mod client;
pub mod config;
pub mod hub;
pub mod transport;
pub mod upload;
pub mod utils;
