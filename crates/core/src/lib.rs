//! mmWave Core - Presence sensing for an ambient display
//!
//! This crate provides:
//! - Sensor wire protocol (frame codec and stream reassembler)
//! - Serial transport with discovery, handshake and reconnect
//! - Presence engine driving display power
//! - Display power control with command fallbacks
//! - Status snapshots for external pollers
//! - Error types

pub mod config;
pub mod display;
pub mod error;
pub mod presence;
pub mod protocol;
pub mod status;
pub mod streaming;
pub mod transport;
pub mod types;

// Re-export common types
pub use config::{SensorConfig, Timing};
pub use display::{DisplayController, DisplayHandle, DisplayPower};
pub use error::{CoreError, DecodeError, DiscoveryError, Result};
pub use presence::{PresenceEngine, PresenceSnapshot};
pub use protocol::{FrameCodec, FrameReassembler};
pub use status::{StatusService, StatusSnapshot};
pub use streaming::LinkEvent;
pub use transport::{SensorLink, SerialOpener};
pub use types::{CommandFrame, DisplayEvent, LinkState, ReportFrame, TargetStatus};
