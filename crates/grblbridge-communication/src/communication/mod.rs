//! Serial port communication
//!
//! One serial link per session: the motion controller on one port and,
//! optionally, the jog pendant on a second. No two components write to the
//! same link; each link is owned by exactly one session.

pub mod serial;

pub use serial::{list_ports, ConnectionParams, RealSerialPort, SerialLink, SerialPortInfo};
