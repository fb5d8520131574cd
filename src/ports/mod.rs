//! Port traits (interfaces)
//!
//! These traits define the boundary between the handle and the host's serial
//! driver. Adapters implement them to connect to real hardware or a mock line.

pub mod serial;

pub use serial::*;
