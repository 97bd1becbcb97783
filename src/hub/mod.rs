//! The hub is the single authority over which clients are connected.
//!
//! Public types:
//! - `Hub`: owns the client set and runs the control loop.
//! - `HubHandle`: cloneable submission side (register, unregister, broadcast).
//! - `Envelope`: the chat/link message exchanged between browsers.

pub mod engine;
pub mod message;

pub use engine::{Broadcast, Hub, HubHandle};
pub use message::{Envelope, MessageKind};

#[cfg(test)]
mod tests;
