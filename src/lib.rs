//! Event-driven serial port wrapper
//!
//! Configure a port, open it, and get received bytes pushed to you through a
//! callback or a channel instead of blocking on reads.
//!
//! ## Architecture (Hexagonal / Ports & Adapters)
//!
//! - `domain/` - Pure domain types (config, packets, errors), no I/O
//! - `ports/` - Trait definitions for the serial driver boundary
//! - `adapters/` - Implementations of ports (serialport crate, mock line)
//! - `notifier` - Fan-out of received packets to subscribers
//! - `reader` - Background thread turning driver reads into notifications
//! - `handle` - `PortHandle`: open/close/send and port state
//! - `catalog` - Static lists of conventional port parameters
//! - `profile` - Named port configurations saved as JSON

// Core domain (pure, no I/O)
pub mod domain;
pub mod ports;

// Adapters (external I/O)
pub mod adapters;

pub mod catalog;
pub mod handle;
pub mod notifier;
pub mod profile;
pub mod reader;

pub use catalog::ParameterCatalog;
pub use domain::{
    Parity, PortConfig, PortState, ReceivedPacket, SerialError, SerialPortInfo, SerialResult,
    StopBits,
};
pub use handle::PortHandle;
pub use notifier::{ReceiveNotifier, SubscriptionId};
pub use profile::{PortProfile, ProfileStore};

use adapters::SerialPortBackend;
use ports::SerialBackend;

/// List serial ports on the host
pub fn available_ports() -> SerialResult<Vec<SerialPortInfo>> {
    SerialPortBackend.list_ports()
}
