//! Configuration for the bridge daemon
//!
//! Loaded from a TOML or JSON file; every field has a default so a missing
//! file or an empty table still yields a working configuration. Defaults
//! match the classic single-board setup: the controller on a USB serial
//! adapter and the pendant on the on-board UART.

use grblbridge_communication::{ConnectionParams, DeviceOptions};
use grblbridge_core::{Error, Result, TravelConvention};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Motion controller link.
    pub device: DeviceSettings,
    /// Jog pendant link.
    pub jogger: JoggerSettings,
}

/// Motion controller connection and pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Serial port for the controller.
    pub port: String,
    /// Baud rate for the controller link.
    pub baud_rate: u32,
    /// Status poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Feed rate used for jog commands (units/min).
    pub jog_feed_rate: u32,
    /// Which corner of each axis the machine homes to.
    pub travel_convention: TravelConvention,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115200,
            poll_interval_ms: 1000,
            jog_feed_rate: 1000,
            travel_convention: TravelConvention::default(),
        }
    }
}

/// Jog pendant settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JoggerSettings {
    /// Whether to bridge a pendant at all.
    pub enabled: bool,
    /// Serial port for the pendant.
    pub port: String,
    /// Baud rate for the pendant link.
    pub baud_rate: u32,
}

impl Default for JoggerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            port: "/dev/ttyAMA0".to_string(),
            baud_rate: 19200,
        }
    }
}

impl Config {
    /// Load configuration from a .toml or .json file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| Error::config(e.to_string()))
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content).map_err(|e| Error::config(e.to_string()))
        } else {
            Err(Error::config("Config file must be .json or .toml"))
        }
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!("No config file at {}; using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Connection parameters for the controller link
    pub fn device_params(&self) -> ConnectionParams {
        ConnectionParams::new(&self.device.port, self.device.baud_rate)
    }

    /// Connection parameters for the pendant link
    pub fn jogger_params(&self) -> ConnectionParams {
        ConnectionParams::new(&self.jogger.port, self.jogger.baud_rate)
    }

    /// Device session options derived from the settings
    pub fn device_options(&self) -> DeviceOptions {
        DeviceOptions {
            jog_feed_rate: self.device.jog_feed_rate,
            travel_convention: self.device.travel_convention,
            poll_interval: Duration::from_millis(self.device.poll_interval_ms),
        }
    }
}
