//! Background reader: turns "bytes available" into notifier deliveries.
//!
//! The reader thread owns a cloned connection and polls it at the driver's
//! short interval. Each non-empty drain of the receive buffer becomes exactly
//! one `ReceivedPacket`, whatever its size. A read error means the link is gone: the error is
//! recorded, the link is marked lost and the thread exits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crate::domain::{ReceivedPacket, SerialError, SerialResult};
use crate::notifier::ReceiveNotifier;
use crate::ports::SerialConnection;

/// State shared between a `PortHandle` and its reader thread.
#[derive(Debug, Default)]
pub struct LinkStatus {
    lost: AtomicBool,
    last_error: Mutex<Option<String>>,
}

impl LinkStatus {
    /// Remember `err` as the most recent human-readable failure
    pub fn record(&self, err: &SerialError) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(err.to_string());
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_error(&self) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn mark_lost(&self) {
        self.lost.store(true, Ordering::SeqCst);
    }

    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }

    pub fn reset_link(&self) {
        self.lost.store(false, Ordering::SeqCst);
    }
}

/// Handle to a running reader thread. Stops and joins on drop.
pub struct ReaderTask {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ReaderTask {
    pub fn spawn(
        connection: Box<dyn SerialConnection>,
        notifier: ReceiveNotifier,
        status: Arc<LinkStatus>,
        port_name: &str,
    ) -> SerialResult<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let name = port_name.to_string();

        let handle = thread::Builder::new()
            .name(format!("serial-rx-{port_name}"))
            .spawn(move || run_reader(connection, notifier, status, thread_stop, name))
            .map_err(|e| SerialError::Serial(format!("Failed to spawn reader thread: {e}")))?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Signal the thread and wait for it. No delivery happens after this returns.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Serial reader thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ReaderTask {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The receive loop, runs on its own thread.
fn run_reader(
    mut connection: Box<dyn SerialConnection>,
    notifier: ReceiveNotifier,
    status: Arc<LinkStatus>,
    stop: Arc<AtomicBool>,
    port_name: String,
) {
    log::debug!("[{port_name}] reader started");

    while !stop.load(Ordering::SeqCst) {
        match connection.read_available() {
            // Nothing arrived during this poll
            Ok(bytes) if bytes.is_empty() => {}
            Ok(bytes) => {
                log::debug!("[{port_name}] RX {} bytes", bytes.len());
                notifier.notify(ReceivedPacket::new(bytes));
            }
            Err(e) => {
                log::warn!("[{port_name}] receive failed, stopping reader: {e}");
                status.record(&e);
                status.mark_lost();
                break;
            }
        }
    }

    if let Err(e) = connection.close() {
        log::debug!("[{port_name}] reader close: {e}");
    }
    log::debug!("[{port_name}] reader stopped");
}
