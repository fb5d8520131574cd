//! Core domain types

use serde::{Deserialize, Serialize};

/// Bytes drained from the OS receive buffer in one notification.
///
/// No message boundaries are implied: a packet may hold part of a logical
/// message or several messages back to back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedPacket {
    bytes: Vec<u8>,
}

impl ReceivedPacket {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lossy text view, handy for terminals and logs
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl From<Vec<u8>> for ReceivedPacket {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl AsRef<[u8]> for ReceivedPacket {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Lifecycle of a `PortHandle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortState {
    Closed,
    Open,
}

/// Information about a serial port found on the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialPortInfo {
    pub name: String,
    pub port_type: String,
}
