//! Serial port traits
//!
//! Split into two traits:
//! - `SerialBackend`: lists ports and opens them from a `PortConfig`
//! - `SerialConnection`: instance methods for reading/writing an open port

use crate::domain::{PortConfig, SerialPortInfo, SerialResult};

/// Opens serial connections. One backend talks to the host driver, another
/// keeps an in-memory line for tests.
pub trait SerialBackend: Send {
    /// List available serial ports on the system
    fn list_ports(&self) -> SerialResult<Vec<SerialPortInfo>>;

    /// Open and configure a port, returning a boxed connection
    fn open(&self, config: &PortConfig) -> SerialResult<Box<dyn SerialConnection>>;
}

/// An open serial port connection.
/// Only requires `Send` (not `Sync`). The reader thread and the writer each
/// own their own clone.
pub trait SerialConnection: Send {
    /// Write every byte of `data` to the port
    fn write_all(&mut self, data: &[u8]) -> SerialResult<()>;

    /// Drain everything currently in the receive buffer as one chunk,
    /// waiting at most a short poll interval. An empty vec means nothing
    /// arrived in that window.
    fn read_available(&mut self) -> SerialResult<Vec<u8>>;

    /// A second handle to the same OS resource, used by the reader thread
    fn try_clone(&self) -> SerialResult<Box<dyn SerialConnection>>;

    /// Release this handle
    fn close(&mut self) -> SerialResult<()>;

    /// Check if the port is still connected
    fn is_connected(&self) -> bool;
}
