//! Read-only status snapshot
//!
//! Combines the presence state, the link counters and the effective
//! configuration into the JSON document served to external pollers.

use serde::Serialize;
use std::sync::Arc;

use crate::config::{ConfigSummary, SensorConfig};
use crate::presence::{PresenceEngine, PresenceSnapshot};
use crate::transport::{LinkSnapshot, SensorLink};
use crate::types::LinkState;

/// Status document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub present: bool,
    pub last_presence: u64,
    pub display_on: bool,
    pub seconds_since_presence: u64,
    pub connection_status: LinkState,
    pub port: String,
    pub bytes_received: u64,
    pub frames_received: u64,
    pub frames_dropped: u64,
    pub noise_bytes: u64,
    pub decode_errors: u64,
    pub reconnects: u64,
    pub last_error: Option<String>,
    pub disabled: bool,
    pub config: ConfigSummary,
}

impl StatusSnapshot {
    pub fn from_parts(presence: PresenceSnapshot, link: LinkSnapshot, config: ConfigSummary) -> Self {
        Self {
            present: presence.present,
            last_presence: presence.last_presence,
            display_on: presence.display_on,
            seconds_since_presence: presence.seconds_since_presence,
            connection_status: link.connection_status,
            port: link.port,
            bytes_received: link.bytes_received,
            frames_received: link.frames_received,
            frames_dropped: link.frames_dropped,
            noise_bytes: link.noise_bytes,
            decode_errors: link.decode_errors,
            reconnects: link.reconnects,
            last_error: link.last_error,
            disabled: presence.disabled,
            config,
        }
    }
}

/// Builds snapshots and carries out the manual controls
#[derive(Clone)]
pub struct StatusService {
    engine: Arc<PresenceEngine>,
    link: Arc<SensorLink>,
    config: ConfigSummary,
}

impl StatusService {
    pub fn new(engine: Arc<PresenceEngine>, link: Arc<SensorLink>, config: &SensorConfig) -> Self {
        Self {
            engine,
            link,
            config: config.summary(),
        }
    }

    pub async fn snapshot(&self) -> StatusSnapshot {
        let presence = self.engine.snapshot().await;
        let link = self.link.snapshot().await;
        StatusSnapshot::from_parts(presence, link, self.config)
    }

    /// Manual presence; returns the resulting status
    pub async fn trigger(&self) -> StatusSnapshot {
        self.engine.trigger().await;
        self.snapshot().await
    }

    /// Stop the sensor link and force the display on
    pub async fn disable(&self) -> StatusSnapshot {
        self.link.stop();
        self.engine.disable().await;
        self.snapshot().await
    }
}
