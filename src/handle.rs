//! PortHandle: owns one serial port session.
//!
//! A handle holds the port configuration, the open connection (if any) and
//! the reader thread that forwards received bytes to subscribers. Every
//! fallible operation returns its error and also mirrors the message into
//! `last_error()` for callers that poll.
//!
//! ```no_run
//! use asyncserial::{PortConfig, PortHandle};
//!
//! let config = PortConfig::from_names("COM5", 9600, "none", 8, "one");
//! let mut port = PortHandle::new(config)?;
//! port.on_packet(|packet| println!("{}", packet.to_text()));
//! port.open()?;
//! port.send_text("ping")?;
//! port.close();
//! # Ok::<(), asyncserial::SerialError>(())
//! ```

use std::sync::Arc;

use crossbeam_channel::Receiver;

use crate::adapters::SerialPortBackend;
use crate::domain::{PortConfig, PortState, ReceivedPacket, SerialError, SerialResult};
use crate::notifier::{ReceiveNotifier, SubscriptionId};
use crate::ports::{SerialBackend, SerialConnection};
use crate::reader::{LinkStatus, ReaderTask};

pub struct PortHandle {
    config: PortConfig,
    backend: Box<dyn SerialBackend>,
    connection: Option<Box<dyn SerialConnection>>,
    reader: Option<ReaderTask>,
    notifier: ReceiveNotifier,
    status: Arc<LinkStatus>,
}

impl PortHandle {
    /// Create a closed handle for the host's serial driver.
    pub fn new(config: PortConfig) -> SerialResult<Self> {
        Self::with_backend(config, SerialPortBackend)
    }

    /// Create a closed handle using `backend` to reach the port.
    pub fn with_backend(
        config: PortConfig,
        backend: impl SerialBackend + 'static,
    ) -> SerialResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            backend: Box::new(backend),
            connection: None,
            reader: None,
            notifier: ReceiveNotifier::new(),
            status: Arc::new(LinkStatus::default()),
        })
    }

    pub fn config(&self) -> &PortConfig {
        &self.config
    }

    /// Open the port and start delivering received bytes.
    ///
    /// Opening an already open handle is a no-op. On failure the handle
    /// stays closed.
    pub fn open(&mut self) -> SerialResult<()> {
        if self.is_open() {
            return Ok(());
        }
        // A lost link still holds its handles until released
        self.release();

        let result = self.try_open();
        match &result {
            Ok(()) => log::info!("Opened {}", self.config),
            Err(e) => {
                log::warn!("Open {} failed: {e}", self.config.port_name);
                self.status.record(e);
            }
        }
        result
    }

    fn try_open(&mut self) -> SerialResult<()> {
        let mut connection = self.backend.open(&self.config)?;

        let reader_connection = match connection.try_clone() {
            Ok(c) => c,
            Err(e) => {
                if let Err(close_err) = connection.close() {
                    log::debug!(
                        "Ignoring close error on {}: {close_err}",
                        self.config.port_name
                    );
                }
                return Err(e);
            }
        };

        self.status.reset_link();
        let reader = match ReaderTask::spawn(
            reader_connection,
            self.notifier.clone(),
            Arc::clone(&self.status),
            &self.config.port_name,
        ) {
            Ok(r) => r,
            Err(e) => {
                if let Err(close_err) = connection.close() {
                    log::debug!(
                        "Ignoring close error on {}: {close_err}",
                        self.config.port_name
                    );
                }
                return Err(e);
            }
        };

        self.connection = Some(connection);
        self.reader = Some(reader);
        Ok(())
    }

    /// Stop receiving and release the port. Safe to call when closed.
    pub fn close(&mut self) {
        if self.release() {
            log::info!("Closed {}", self.config.port_name);
        }
    }

    /// Tear down the reader and the connection. Returns true if anything was held.
    fn release(&mut self) -> bool {
        let held = self.connection.is_some() || self.reader.is_some();
        if let Some(mut reader) = self.reader.take() {
            reader.stop();
        }
        if let Some(mut connection) = self.connection.take() {
            // The device may already be gone; there is nothing left to do either way
            if let Err(e) = connection.close() {
                log::debug!("Ignoring close error on {}: {e}", self.config.port_name);
            }
        }
        held
    }

    /// Write raw bytes. Fails with `NotOpen` on a closed handle and with
    /// `EmptyPayload` for an empty slice; neither touches the device.
    pub fn send(&mut self, data: &[u8]) -> SerialResult<()> {
        let result = self.write(data);
        if let Err(e) = &result {
            log::warn!("Send on {} failed: {e}", self.config.port_name);
            self.status.record(e);
        }
        result
    }

    /// Write UTF-8 text
    pub fn send_text(&mut self, text: &str) -> SerialResult<()> {
        self.send(text.as_bytes())
    }

    fn write(&mut self, data: &[u8]) -> SerialResult<()> {
        if !self.is_open() {
            return Err(SerialError::NotOpen);
        }
        if data.is_empty() {
            return Err(SerialError::EmptyPayload);
        }
        let connection = self.connection.as_mut().ok_or(SerialError::NotOpen)?;
        connection.write_all(data)?;
        log::debug!("[{}] TX {} bytes", self.config.port_name, data.len());
        Ok(())
    }

    /// True while the port is open, the driver still reports the device
    /// connected and the reader has not lost the link
    pub fn is_open(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|connection| connection.is_connected())
            && !self.status.is_lost()
    }

    pub fn state(&self) -> PortState {
        if self.is_open() {
            PortState::Open
        } else {
            PortState::Closed
        }
    }

    /// Most recent failure message, if any
    pub fn last_error(&self) -> Option<String> {
        self.status.last_error()
    }

    pub fn clear_error(&self) {
        self.status.clear_error();
    }

    /// Register a callback for received packets. It runs on the reader
    /// thread, not the caller's.
    pub fn on_packet<F>(&self, callback: F) -> SubscriptionId
    where
        F: FnMut(&ReceivedPacket) + Send + 'static,
    {
        self.notifier.subscribe(callback)
    }

    /// Receive packets through a channel instead of a callback
    pub fn subscribe(&self) -> Receiver<ReceivedPacket> {
        self.notifier.subscribe_channel()
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    pub fn notifier(&self) -> &ReceiveNotifier {
        &self.notifier
    }
}

impl Drop for PortHandle {
    fn drop(&mut self) {
        self.release();
    }
}
