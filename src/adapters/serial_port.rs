//! Serial port adapter using the `serialport` crate
//!
//! Implements `SerialBackend` and `SerialConnection`.
//! `SerialPortBackend` has no instance data: it just lists ports and opens
//! them through the host driver.

use std::io::{ErrorKind, Read, Write};
use std::thread;
use std::time::Duration;

use crate::domain::{
    Parity, PortConfig, SerialError, SerialPortInfo, SerialResult, StopBits,
};
use crate::ports::{SerialBackend, SerialConnection};

/// Driver read timeout for draining bytes already reported as buffered
const READ_TIMEOUT_MS: u64 = 50;

/// Idle wait when the receive buffer is empty. Bounds how long `close()`
/// waits for the reader thread.
const POLL_INTERVAL_MS: u64 = 5;

/// Zero-sized backend that talks to the host's serial driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialPortBackend;

impl SerialBackend for SerialPortBackend {
    fn list_ports(&self) -> SerialResult<Vec<SerialPortInfo>> {
        let mut ports: Vec<SerialPortInfo> = serialport::available_ports()
            .map_err(|e| SerialError::Serial(format!("Failed to list ports: {e}")))?
            .into_iter()
            .map(|p| SerialPortInfo {
                port_type: describe_port_type(&p.port_type),
                name: p.port_name,
            })
            .collect();
        ports.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(ports)
    }

    fn open(&self, config: &PortConfig) -> SerialResult<Box<dyn SerialConnection>> {
        let serial = serialport::new(&config.port_name, config.baud_rate)
            .data_bits(to_serialport_data_bits(config.data_bits)?)
            .parity(to_serialport_parity(config.parity)?)
            .stop_bits(to_serialport_stop_bits(config.stop_bits)?)
            .flow_control(serialport::FlowControl::None)
            .timeout(Duration::from_millis(READ_TIMEOUT_MS))
            .open()
            .map_err(|e| SerialError::Open {
                port: config.port_name.clone(),
                reason: e.to_string(),
            })?;

        log::debug!("Opened {config} via host driver");

        Ok(Box::new(SerialPortConnection {
            port: Some(serial),
        }))
    }
}

/// Short human label for a port, e.g. "USB 0403:6001 FT232R USB UART"
pub fn describe_port_type(port_type: &serialport::SerialPortType) -> String {
    match port_type {
        serialport::SerialPortType::UsbPort(usb) => describe_usb(
            usb.vid,
            usb.pid,
            usb.product.as_deref().or(usb.manufacturer.as_deref()),
        ),
        serialport::SerialPortType::PciPort => "PCI".to_string(),
        serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        serialport::SerialPortType::Unknown => "Onboard".to_string(),
    }
}

fn describe_usb(vid: u16, pid: u16, label: Option<&str>) -> String {
    let ids = format!("USB {vid:04x}:{pid:04x}");
    match label {
        Some(label) => format!("{ids} {label}"),
        None => ids,
    }
}

/// Map data bits onto the driver's type. Only 5 through 8 exist.
pub fn to_serialport_data_bits(bits: u8) -> SerialResult<serialport::DataBits> {
    match bits {
        5 => Ok(serialport::DataBits::Five),
        6 => Ok(serialport::DataBits::Six),
        7 => Ok(serialport::DataBits::Seven),
        8 => Ok(serialport::DataBits::Eight),
        other => Err(SerialError::Configuration(format!(
            "{other} data bits not supported by the host driver"
        ))),
    }
}

/// Map parity onto the driver's type. Mark and space have no driver equivalent.
pub fn to_serialport_parity(parity: Parity) -> SerialResult<serialport::Parity> {
    match parity {
        Parity::None => Ok(serialport::Parity::None),
        Parity::Odd => Ok(serialport::Parity::Odd),
        Parity::Even => Ok(serialport::Parity::Even),
        Parity::Mark | Parity::Space => Err(SerialError::Configuration(format!(
            "{parity} parity not supported by the host driver"
        ))),
    }
}

/// Map stop bits onto the driver's type. Only one and two exist.
pub fn to_serialport_stop_bits(stop_bits: StopBits) -> SerialResult<serialport::StopBits> {
    match stop_bits {
        StopBits::One => Ok(serialport::StopBits::One),
        StopBits::Two => Ok(serialport::StopBits::Two),
        StopBits::None | StopBits::OnePointFive => Err(SerialError::Configuration(format!(
            "{stop_bits} stop bits not supported by the host driver"
        ))),
    }
}

/// An open serial port connection wrapping the `serialport` crate.
pub struct SerialPortConnection {
    port: Option<Box<dyn serialport::SerialPort>>,
}

impl SerialPortConnection {
    fn port_mut(&mut self) -> SerialResult<&mut Box<dyn serialport::SerialPort>> {
        self.port.as_mut().ok_or(SerialError::NotOpen)
    }
}

impl SerialConnection for SerialPortConnection {
    fn write_all(&mut self, data: &[u8]) -> SerialResult<()> {
        let port = self.port_mut()?;
        port.write_all(data)
            .map_err(|e| SerialError::Write(e.to_string()))?;
        port.flush().map_err(|e| SerialError::Write(e.to_string()))
    }

    fn read_available(&mut self) -> SerialResult<Vec<u8>> {
        let port = self.port_mut()?;
        let available = port
            .bytes_to_read()
            .map_err(|e| SerialError::Read(e.to_string()))? as usize;
        if available == 0 {
            thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; available];
        let mut filled = 0;
        while filled < available {
            match port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                    ) =>
                {
                    break
                }
                Err(e) => return Err(SerialError::Read(e.to_string())),
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }

    fn try_clone(&self) -> SerialResult<Box<dyn SerialConnection>> {
        let port = self.port.as_ref().ok_or(SerialError::NotOpen)?;
        let clone = port
            .try_clone()
            .map_err(|e| SerialError::Open {
                port: port.name().unwrap_or_default(),
                reason: format!("Failed to clone handle: {e}"),
            })?;
        Ok(Box::new(SerialPortConnection { port: Some(clone) }))
    }

    fn close(&mut self) -> SerialResult<()> {
        // Dropping the boxed port releases the OS handle
        self.port = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}
