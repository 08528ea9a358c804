//! Serial port implementation
//!
//! Provides low-level serial port operations for the motion controller and
//! jog pendant links.
//!
//! Supports:
//! - Port enumeration and discovery
//! - Baud rate configuration
//! - Short-timeout reads for the polling io loops

use grblbridge_core::{ConnectionError, Error, Result};
use std::io::{self, Read, Write};
use std::sync::Mutex;
use std::time::Duration;

/// Parameters for opening a serial link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Port path (e.g., "/dev/ttyUSB0", "COM3").
    pub port: String,
    /// Baud rate.
    pub baud_rate: u32,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: 115200,
        }
    }
}

impl ConnectionParams {
    /// Create parameters for a port at a baud rate
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
        }
    }
}

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port_name: String,

    /// Port description (e.g., "USB Serial Port")
    pub description: String,
}

/// List available serial ports on the system
///
/// Filters ports to include only device patterns a controller or pendant
/// plausibly enumerates as:
/// - Windows: COM* (e.g., COM1, COM3)
/// - Linux: /dev/ttyUSB*, /dev/ttyACM*, /dev/ttyAMA*
/// - macOS: /dev/cu.usbserial-*, /dev/cu.usbmodem*
pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
    match serialport::available_ports() {
        Ok(ports) => Ok(ports
            .iter()
            .filter(|port| is_valid_device_port(&port.port_name))
            .map(|port| SerialPortInfo {
                port_name: port.port_name.clone(),
                description: get_port_description(port),
            })
            .collect()),
        Err(e) => {
            tracing::error!("Failed to enumerate serial ports: {}", e);
            Err(Error::Connection(ConnectionError::EnumerationFailed {
                reason: e.to_string(),
            }))
        }
    }
}

/// Check if a port name matches a plausible device pattern
fn is_valid_device_port(port_name: &str) -> bool {
    // Windows COM ports
    if port_name.starts_with("COM") && port_name[3..].chars().all(|c| c.is_ascii_digit()) {
        return true;
    }

    // Linux USB, ACM, and on-board UART devices
    if port_name.starts_with("/dev/ttyUSB")
        || port_name.starts_with("/dev/ttyACM")
        || port_name.starts_with("/dev/ttyAMA")
    {
        return true;
    }

    // macOS serial and modem devices
    if port_name.starts_with("/dev/cu.usbserial-") || port_name.starts_with("/dev/cu.usbmodem") {
        return true;
    }

    false
}

/// Get a user-friendly description for a port
fn get_port_description(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb_info) => {
            format!(
                "USB {} {}",
                usb_info.manufacturer.as_deref().unwrap_or("Device"),
                usb_info.product.as_deref().unwrap_or("Serial Port")
            )
        }
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}

/// Low-level serial link interface
///
/// A link is owned by exactly one session. Reads use a short timeout so the
/// owning io loop can interleave writes and polls.
pub trait SerialLink: Send {
    /// Write the whole buffer to the link
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Read available data from the link; may time out with `TimedOut`
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Get the port name
    fn name(&self) -> &str;
}

/// Trait for serial port I/O operations
pub trait ReadWrite: Read + Write + Send {}
impl<T: Read + Write + Send> ReadWrite for T {}

/// Real serial port implementation using the serialport crate
pub struct RealSerialPort {
    port: Mutex<Box<dyn ReadWrite>>,
    name: String,
}

impl RealSerialPort {
    /// Open a serial port with the given parameters
    ///
    /// The read timeout is kept short (10 ms) so the io loop spins without
    /// blocking writes for long.
    pub fn open(params: &ConnectionParams) -> Result<Self> {
        let builder = serialport::new(&params.port, params.baud_rate)
            .timeout(Duration::from_millis(10))
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None);

        match builder.open_native() {
            Ok(port) => Ok(RealSerialPort {
                port: Mutex::new(Box::new(port)),
                name: params.port.clone(),
            }),
            Err(e) => {
                tracing::warn!("Failed to open serial port {}: {}", params.port, e);
                Err(Error::Connection(ConnectionError::OpenFailed {
                    port: params.port.clone(),
                    reason: e.to_string(),
                }))
            }
        }
    }
}

impl SerialLink for RealSerialPort {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        match self.port.lock() {
            Ok(mut port) => port.write_all(data),
            Err(e) => Err(io::Error::other(e.to_string())),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.port.lock() {
            Ok(mut port) => port.read(buf),
            Err(e) => Err(io::Error::other(e.to_string())),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
