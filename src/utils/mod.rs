//! The `utils` module provides the pieces shared by every other part of
//! `lanchat`: the crate-wide error type, logging setup, and the shutdown
//! signal that ties the accept loop, the hub and the pumps together.

pub mod error;
pub mod logging;
pub mod shutdown;
