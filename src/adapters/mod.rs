//! Adapters implementing the serial port traits
//!
//! - `serial_port`: the host driver via the `serialport` crate
//! - `mock_serial`: an in-memory line for tests and demos

pub mod mock_serial;
pub mod serial_port;

pub use mock_serial::{MockLine, MockSerialBackend};
pub use serial_port::SerialPortBackend;
