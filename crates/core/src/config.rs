//! Sensor and presence configuration
//!
//! Values are supplied once at startup and treated as immutable for the
//! lifetime of the process.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CoreError, Result};

pub const DEFAULT_PORT: &str = "/dev/ttyAMA0";
pub const DEFAULT_BAUD_RATE: u32 = 256_000;
pub const DEFAULT_SENSITIVITY: u8 = 40;
pub const DEFAULT_OFF_DELAY_SECS: u64 = 60;

/// Alternate device paths probed when the primary one is missing
pub const DEFAULT_FALLBACK_PORTS: &[&str] = &[
    "/dev/serial0",
    "/dev/ttyS0",
    "/dev/ttyAMA1",
    "/dev/ttyUSB0",
    "/dev/ttyACM0",
];

/// Raspberry Pi boot configs checked when diagnosing a missing UART
pub const DEFAULT_BOOT_CONFIGS: &[&str] = &["/boot/firmware/config.txt", "/boot/config.txt"];

/// Fixed delays driving the link and presence timers
#[derive(Debug, Clone)]
pub struct Timing {
    /// Presence timeout check interval
    pub tick: Duration,
    /// Wait before reopening after a read error or close
    pub reconnect_delay: Duration,
    /// Wait before re-running discovery when no device exists
    pub discovery_retry: Duration,
    /// Wait after opening before the configuration handshake
    pub settle_delay: Duration,
    /// Gap between handshake commands
    pub handshake_step: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(5),
            reconnect_delay: Duration::from_secs(5),
            discovery_retry: Duration::from_secs(10),
            settle_delay: Duration::from_millis(500),
            handshake_step: Duration::from_millis(150),
        }
    }
}

/// Complete configuration of the presence subsystem
#[derive(Debug, Clone)]
pub struct SensorConfig {
    /// Preferred serial device
    pub port: PathBuf,
    /// Probed in order when `port` does not exist
    pub fallback_ports: Vec<PathBuf>,
    /// Files inspected to tell "no hardware" from "UART disabled"
    pub boot_configs: Vec<PathBuf>,
    pub baud_rate: u32,
    /// Motion and static sensitivity for all gates, 0-100
    pub sensitivity: u8,
    /// Continuous absence required before the display turns off
    pub off_delay: Duration,
    pub timing: Timing,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            port: PathBuf::from(DEFAULT_PORT),
            fallback_ports: DEFAULT_FALLBACK_PORTS.iter().map(PathBuf::from).collect(),
            boot_configs: DEFAULT_BOOT_CONFIGS.iter().map(PathBuf::from).collect(),
            baud_rate: DEFAULT_BAUD_RATE,
            sensitivity: DEFAULT_SENSITIVITY,
            off_delay: Duration::from_secs(DEFAULT_OFF_DELAY_SECS),
            timing: Timing::default(),
        }
    }
}

impl SensorConfig {
    pub fn with_port(mut self, port: impl Into<PathBuf>) -> Self {
        self.port = port.into();
        self
    }

    pub fn with_fallback_ports(mut self, ports: Vec<PathBuf>) -> Self {
        self.fallback_ports = ports;
        self
    }

    pub fn with_off_delay(mut self, off_delay: Duration) -> Self {
        self.off_delay = off_delay;
        self
    }

    pub fn with_sensitivity(mut self, sensitivity: u8) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// Reject values the sensor or the state machine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.port.as_os_str().is_empty() {
            return Err(CoreError::Config("serial port path is empty".into()));
        }
        if self.baud_rate == 0 {
            return Err(CoreError::Config("baud rate must be positive".into()));
        }
        if self.sensitivity > 100 {
            return Err(CoreError::Config(format!(
                "sensitivity must be 0-100, got {}",
                self.sensitivity
            )));
        }
        if self.off_delay.is_zero() {
            return Err(CoreError::Config("off-delay must be positive".into()));
        }
        if self.timing.tick.is_zero() {
            return Err(CoreError::Config("tick interval must be positive".into()));
        }
        Ok(())
    }

    /// Subset echoed in the status endpoint
    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            off_delay: self.off_delay.as_secs(),
            sensitivity: self.sensitivity,
            baud_rate: self.baud_rate,
        }
    }
}

/// Configuration values exposed to status clients
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSummary {
    pub off_delay: u64,
    pub sensitivity: u8,
    pub baud_rate: u32,
}
