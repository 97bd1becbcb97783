//! The `client` module defines the hub's view of one connected peer.
//!
//! A `Client` is the sending side of a bounded per-connection queue plus a
//! shared `Lifecycle` that both pumps and the hub use to tear the
//! connection down. The hub knows clients only by their opaque `ClientId`.

pub mod connection;
pub mod lifecycle;

pub use connection::{Client, ClientId};
pub use lifecycle::{ClientState, Lifecycle};
