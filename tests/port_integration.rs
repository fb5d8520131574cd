//! Integration tests: PortHandle driven end to end over the mock backend
//!
//! These tests exercise the full path PortHandle → reader thread →
//! ReceiveNotifier → subscriber without real hardware. The mock line records
//! every write and turns each injected chunk into one drain of the receive
//! buffer.
//!
//! Run with: cargo test

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use asyncserial::adapters::{MockLine, MockSerialBackend, SerialPortBackend};
use asyncserial::{Parity, PortConfig, PortHandle, PortState, ReceivedPacket, SerialError, StopBits};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

fn com5() -> PortConfig {
    PortConfig::from_names("COM5", 9600, "none", 8, "one")
}

fn mock_handle() -> (PortHandle, MockLine) {
    let backend = MockSerialBackend::new();
    let line = backend.add_port("COM5");
    (PortHandle::with_backend(com5(), backend).unwrap(), line)
}

/// Poll until `cond` holds or roughly two seconds pass.
fn wait_for(cond: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    cond()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// COM5 at 9600 8-N-1: open, send "ping", receive 3 bytes, close.
#[test]
fn mocked_session_round_trip() {
    let (mut port, line) = mock_handle();
    assert_eq!(port.config().parity, Parity::None);
    assert_eq!(port.config().stop_bits, StopBits::One);

    let rx = port.subscribe();
    port.open().unwrap();
    assert!(port.is_open());
    assert_eq!(port.state(), PortState::Open);

    port.send_text("ping").unwrap();
    assert_eq!(line.written(), b"ping");

    line.inject(&[0x10, 0x20, 0x30]);
    let packet = rx.recv_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!(packet.bytes(), &[0x10, 0x20, 0x30]);
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

    port.close();
    assert!(!port.is_open());
    assert_eq!(port.state(), PortState::Closed);
    assert!(!line.is_open());
}

/// Separate arrivals are never merged or split.
#[test]
fn each_arrival_is_one_notification() {
    let (mut port, line) = mock_handle();
    let seen: Arc<Mutex<Vec<Vec<u8>>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    port.on_packet(move |p: &ReceivedPacket| sink.lock().unwrap().push(p.bytes().to_vec()));
    port.open().unwrap();

    let chunks: Vec<Vec<u8>> = vec![b"$GPGGA,".to_vec(), vec![0u8; 100], b"*47\r\n".to_vec()];
    for chunk in &chunks {
        line.inject(chunk);
    }

    assert!(wait_for(|| seen.lock().unwrap().len() == chunks.len()));
    port.close();
    assert_eq!(*seen.lock().unwrap(), chunks);
}

/// A burst larger than any fixed read buffer still arrives as one packet.
#[test]
fn large_arrival_is_one_notification() {
    let (mut port, line) = mock_handle();
    let rx = port.subscribe();
    port.open().unwrap();

    line.inject(&vec![0xAB; 5000]);
    let packet = rx.recv_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!(packet.len(), 5000);
    assert!(packet.bytes().iter().all(|&b| b == 0xAB));
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}

/// A panicking callback is dropped; the port and other subscribers carry on.
#[test]
fn panicking_callback_does_not_stop_the_reader() {
    let (mut port, line) = mock_handle();
    port.on_packet(|_| panic!("subscriber bug"));
    let rx = port.subscribe();
    port.open().unwrap();

    line.inject(b"one");
    assert_eq!(rx.recv_timeout(RECV_TIMEOUT).unwrap().bytes(), b"one");
    line.inject(b"two");
    assert_eq!(rx.recv_timeout(RECV_TIMEOUT).unwrap().bytes(), b"two");

    assert!(port.is_open());
    assert_eq!(port.notifier().subscriber_count(), 1);
    port.send_text("still here").unwrap();
    assert_eq!(line.written(), b"still here");
}

/// Callbacks run on the reader thread, not the caller's.
#[test]
fn callbacks_run_off_the_caller_thread() {
    let (mut port, line) = mock_handle();
    let caller = thread::current().id();
    let (tx, rx) = crossbeam_channel::unbounded();
    port.on_packet(move |_| {
        let _ = tx.send(thread::current().id());
    });
    port.open().unwrap();
    line.inject(b"x");
    let delivered_on = rx.recv_timeout(RECV_TIMEOUT).unwrap();
    assert_ne!(delivered_on, caller);
}

/// No delivery once close() has returned.
#[test]
fn nothing_is_delivered_after_close() {
    let (mut port, line) = mock_handle();
    let rx = port.subscribe();
    port.open().unwrap();
    port.close();
    line.inject(b"late");
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}

#[test]
fn open_missing_device_reports_open_error() {
    let backend = MockSerialBackend::new();
    let mut port = PortHandle::with_backend(
        PortConfig::new("COM42", 9600, Parity::None, 8, StopBits::One),
        backend,
    )
    .unwrap();

    let err = port.open().unwrap_err();
    assert!(matches!(err, SerialError::Open { ref port, .. } if port == "COM42"));
    assert!(!port.is_open());
    assert_eq!(port.last_error(), Some(err.to_string()));
}

#[test]
fn open_missing_host_device_reports_open_error() {
    let config = PortConfig::new(
        "/dev/asyncserial-no-such-port",
        9600,
        Parity::None,
        8,
        StopBits::One,
    );
    let mut port = PortHandle::with_backend(config, SerialPortBackend).unwrap();
    assert!(matches!(port.open(), Err(SerialError::Open { .. })));
    assert!(!port.is_open());
    assert!(port.last_error().is_some());
}

#[test]
fn close_twice_never_fails() {
    let (mut port, _line) = mock_handle();
    port.close();
    assert!(!port.is_open());
    port.open().unwrap();
    port.close();
    port.close();
    assert!(!port.is_open());
}

#[test]
fn send_on_closed_port_writes_nothing() {
    let (mut port, line) = mock_handle();
    assert_eq!(port.send(b"hello"), Err(SerialError::NotOpen));
    port.open().unwrap();
    port.close();
    assert_eq!(port.send_text("hello"), Err(SerialError::NotOpen));
    assert!(line.writes().is_empty());
}

#[test]
fn send_empty_writes_nothing() {
    let (mut port, line) = mock_handle();
    port.open().unwrap();
    assert!(port.send(&[]).is_err());
    assert!(port.send_text("").is_err());
    assert!(line.writes().is_empty());
}

/// Unplugging the device: the handle reports closed, close() still works,
/// and the port can be reopened once the device is back.
#[test]
fn device_removal_is_reported_and_close_is_safe() {
    let backend = MockSerialBackend::new();
    let line = backend.add_port("COM5");
    let mut port = PortHandle::with_backend(com5(), backend.clone()).unwrap();
    port.open().unwrap();

    line.remove_device();
    assert!(wait_for(|| !port.is_open()));
    assert!(port.last_error().unwrap().contains("Read failed"));
    assert_eq!(port.send(b"x"), Err(SerialError::NotOpen));

    port.close();
    assert!(!line.is_open());

    // Device plugged back in under the same name
    backend.add_port("COM5");
    port.clear_error();
    port.open().unwrap();
    assert!(port.is_open());
    assert!(port.last_error().is_none());
}

/// Several subscribers all see the same packet.
#[test]
fn packets_are_broadcast_to_every_subscriber() {
    let (mut port, line) = mock_handle();
    let rx_a = port.subscribe();
    let rx_b = port.subscribe();
    port.open().unwrap();
    line.inject(b"ok");
    assert_eq!(rx_a.recv_timeout(RECV_TIMEOUT).unwrap().bytes(), b"ok");
    assert_eq!(rx_b.recv_timeout(RECV_TIMEOUT).unwrap().bytes(), b"ok");
}

#[test]
fn unsubscribed_callback_is_not_called() {
    let (mut port, line) = mock_handle();
    let id = port.on_packet(|_| panic!("unsubscribed callback was called"));
    let rx = port.subscribe();
    assert!(port.unsubscribe(id));
    port.open().unwrap();
    line.inject(b"z");
    assert_eq!(rx.recv_timeout(RECV_TIMEOUT).unwrap().bytes(), b"z");
}
