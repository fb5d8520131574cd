//! Mock serial adapter for development and testing without hardware.
//!
//! A `MockSerialBackend` knows a set of named ports. Each port is a
//! `MockLine`: a controller the test keeps to inject inbound chunks, inspect
//! what was written and simulate driver failures. Every injected chunk comes
//! back whole from one `read_available()` call, whatever its size, the way
//! one OS "data received" signal drains the buffer once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::domain::{PortConfig, SerialError, SerialPortInfo, SerialResult};
use crate::ports::{SerialBackend, SerialConnection};

/// How long a mock read waits for an injected chunk
const READ_TIMEOUT_MS: u64 = 10;

#[derive(Debug, Default)]
struct LineState {
    /// Every successful write, in order
    writes: Vec<Vec<u8>>,
    /// Live connection handles (an open port plus its reader clone)
    handles: usize,
    opens: usize,
    busy: bool,
    fail_writes: bool,
    removed: bool,
    last_config: Option<PortConfig>,
}

/// Test-side controller for one mock port.
#[derive(Clone)]
pub struct MockLine {
    name: String,
    state: Arc<Mutex<LineState>>,
    inbound_tx: Sender<Vec<u8>>,
    inbound_rx: Receiver<Vec<u8>>,
}

impl MockLine {
    fn new(name: &str) -> Self {
        let (inbound_tx, inbound_rx) = crossbeam_channel::unbounded();
        Self {
            name: name.to_string(),
            state: Arc::new(Mutex::new(LineState::default())),
            inbound_tx,
            inbound_rx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Simulate bytes arriving from the remote end as one OS notification
    pub fn inject(&self, bytes: &[u8]) {
        log::debug!("[MOCK SERIAL] {} ← {} bytes", self.name, bytes.len());
        // The line owns a receiver, so the channel never disconnects
        let _ = self.inbound_tx.send(bytes.to_vec());
    }

    /// All bytes written so far, concatenated
    pub fn written(&self) -> Vec<u8> {
        self.lock().writes.concat()
    }

    /// Individual write calls, in order
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.lock().writes.clone()
    }

    /// True while any handle to the port is still held
    pub fn is_open(&self) -> bool {
        self.lock().handles > 0
    }

    /// Number of successful opens
    pub fn open_count(&self) -> usize {
        self.lock().opens
    }

    /// The settings used by the most recent successful open
    pub fn last_config(&self) -> Option<PortConfig> {
        self.lock().last_config.clone()
    }

    /// Make the next opens fail as if another process held the port
    pub fn set_busy(&self, busy: bool) {
        self.lock().busy = busy;
    }

    /// Make writes fail at the driver level
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Simulate unplugging the device: reads and writes start failing
    pub fn remove_device(&self) {
        log::info!("[MOCK SERIAL] {} removed", self.name);
        self.lock().removed = true;
    }
}

/// In-memory backend holding any number of named mock ports.
#[derive(Clone, Default)]
pub struct MockSerialBackend {
    lines: Arc<Mutex<HashMap<String, MockLine>>>,
}

impl MockSerialBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a port and return its controller
    pub fn add_port(&self, name: &str) -> MockLine {
        let line = MockLine::new(name);
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), line.clone());
        line
    }

    pub fn line(&self, name: &str) -> Option<MockLine> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

impl SerialBackend for MockSerialBackend {
    fn list_ports(&self) -> SerialResult<Vec<SerialPortInfo>> {
        let mut ports: Vec<SerialPortInfo> = self
            .lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .map(|name| SerialPortInfo {
                name: name.clone(),
                port_type: "Mock".to_string(),
            })
            .collect();
        ports.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(ports)
    }

    fn open(&self, config: &PortConfig) -> SerialResult<Box<dyn SerialConnection>> {
        let open_error = |reason: &str| SerialError::Open {
            port: config.port_name.clone(),
            reason: reason.to_string(),
        };

        let line = self
            .line(&config.port_name)
            .ok_or_else(|| open_error("No such device"))?;

        {
            let mut state = line.lock();
            if state.removed {
                return Err(open_error("No such device"));
            }
            if state.busy || state.handles > 0 {
                return Err(open_error("Device or resource busy"));
            }
            state.handles += 1;
            state.opens += 1;
            state.last_config = Some(config.clone());
        }

        log::info!("[MOCK SERIAL] Opened {config}");
        Ok(Box::new(MockConnection::new(line)))
    }
}

/// One handle to a mock port.
pub struct MockConnection {
    line: MockLine,
    open: bool,
}

impl MockConnection {
    fn new(line: MockLine) -> Self {
        Self {
            line,
            open: true,
        }
    }

    fn release(&mut self) {
        if self.open {
            self.open = false;
            let mut state = self.line.lock();
            state.handles = state.handles.saturating_sub(1);
        }
    }

    fn ensure_usable(&self) -> SerialResult<()> {
        if !self.open {
            return Err(SerialError::NotOpen);
        }
        Ok(())
    }
}

impl SerialConnection for MockConnection {
    fn write_all(&mut self, data: &[u8]) -> SerialResult<()> {
        self.ensure_usable()?;
        let mut state = self.line.lock();
        if state.removed {
            return Err(SerialError::Write("Device not configured".to_string()));
        }
        if state.fail_writes {
            return Err(SerialError::Write("Input/output error".to_string()));
        }
        state.writes.push(data.to_vec());
        log::debug!("[MOCK SERIAL] {} → {} bytes", self.line.name, data.len());
        Ok(())
    }

    fn read_available(&mut self) -> SerialResult<Vec<u8>> {
        self.ensure_usable()?;
        if self.line.lock().removed {
            return Err(SerialError::Read("Device not configured".to_string()));
        }
        match self
            .line
            .inbound_rx
            .recv_timeout(Duration::from_millis(READ_TIMEOUT_MS))
        {
            Ok(chunk) => Ok(chunk),
            Err(RecvTimeoutError::Timeout) => Ok(Vec::new()),
            Err(RecvTimeoutError::Disconnected) => {
                Err(SerialError::Read("Mock line disconnected".to_string()))
            }
        }
    }

    fn try_clone(&self) -> SerialResult<Box<dyn SerialConnection>> {
        self.ensure_usable()?;
        self.line.lock().handles += 1;
        Ok(Box::new(MockConnection::new(self.line.clone())))
    }

    fn close(&mut self) -> SerialResult<()> {
        self.release();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.open && !self.line.lock().removed
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.release();
    }
}
