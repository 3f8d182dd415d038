//! Serial transport for the presence sensor
//!
//! This module provides:
//! - Device discovery with fallback paths and UART diagnosis
//! - A `serialport`-backed opener feeding a `LinkEvent` channel
//! - The timed configuration handshake
//! - `SensorLink`, the reconnecting read loop

pub mod discovery;
pub mod handshake;
pub mod link;
pub mod reconnect;
pub mod serial;

pub use link::{LinkSnapshot, SensorLink};
pub use reconnect::{Reconnect, RetryReason};
pub use serial::NativeSerialOpener;

use async_trait::async_trait;
use serialport::{DataBits, Parity, StopBits};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::SensorConfig;
use crate::streaming::LinkEvent;
use crate::Result;

/// Line settings applied when opening the device
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    /// Read timeout; bounds how long a reader takes to notice shutdown
    pub read_timeout: Duration,
}

impl SerialSettings {
    /// 8N1 at the configured baud rate
    pub fn from_config(config: &SensorConfig) -> Self {
        Self {
            baud_rate: config.baud_rate,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            read_timeout: Duration::from_millis(100),
        }
    }
}

/// Write half of an open device
///
/// Writes may block; callers run them on the blocking pool.
pub trait FrameWriter: Send {
    /// Write one encoded frame in full
    fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()>;
}

/// An open device: a writer plus the reader's event channel
pub struct SerialConnection {
    pub writer: Box<dyn FrameWriter>,
    pub events: mpsc::Receiver<LinkEvent>,
}

/// Opens serial devices
///
/// Abstracted so the link can be driven by an in-memory device in tests.
#[async_trait]
pub trait SerialOpener: Send + Sync {
    async fn open(&self, path: &Path, settings: &SerialSettings) -> Result<SerialConnection>;
}
