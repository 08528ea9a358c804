//! # grblbridge Communication
//!
//! Serial links and device sessions for grblbridge.
//! Contains the GRBL reply decoder, the flow-controlled command pipeline,
//! the device session that ties them to a serial port, and the bridge to a
//! hardware jog pendant on a second port.

pub mod communication;
pub mod device;
pub mod firmware;
pub mod jogger;

pub use communication::{
    list_ports, ConnectionParams, RealSerialPort, SerialLink, SerialPortInfo,
};

pub use device::{CommandQueue, DeviceOptions, DeviceSession, GrblDevice};

pub use firmware::grbl::{decode_line, GrblReply, ResponseKind, StatusReport};

pub use jogger::{JoggerBridge, JoggerRequest, JoggerSession, PanelEvent, PanelMessage};
