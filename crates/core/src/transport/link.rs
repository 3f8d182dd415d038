//! Reconnecting sensor link
//!
//! One loop owns the device: discover, open, handshake, then pump reader
//! events through the reassembler and decoder into the presence engine. Any
//! failure ends the connection and the loop waits before trying again, so
//! reconnects can never overlap. The loop exits only on cancellation.

use bytes::Bytes;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::reconnect::{Reconnect, RetryReason};
use super::{discovery, handshake, FrameWriter, SerialOpener, SerialSettings};
use crate::config::SensorConfig;
use crate::presence::PresenceEngine;
use crate::protocol::{FrameCodec, FrameReassembler};
use crate::streaming::LinkEvent;
use crate::types::{LinkState, ReportFrame};

/// Link state and counters
///
/// Byte and frame counters describe the current connection and restart at
/// zero on every successful open.
#[derive(Debug, Clone, Default)]
struct LinkStatus {
    state: LinkState,
    active_port: Option<PathBuf>,
    last_error: Option<String>,
    bytes_received: u64,
    frames_received: u64,
    frames_dropped: u64,
    noise_bytes: u64,
    decode_errors: u64,
    reconnects: u64,
}

/// Copy of the link status for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSnapshot {
    pub connection_status: LinkState,
    /// Active device, or the configured one when not connected
    pub port: String,
    pub bytes_received: u64,
    pub frames_received: u64,
    pub frames_dropped: u64,
    /// Bytes skipped while searching for a frame header
    pub noise_bytes: u64,
    pub decode_errors: u64,
    pub reconnects: u64,
    pub last_error: Option<String>,
}

pub struct SensorLink {
    config: SensorConfig,
    settings: SerialSettings,
    opener: Arc<dyn SerialOpener>,
    engine: Arc<PresenceEngine>,
    status: RwLock<LinkStatus>,
    cancel: CancellationToken,
}

impl SensorLink {
    /// `cancel` stops the link; pass a child of the process token
    pub fn new(
        config: SensorConfig,
        opener: Arc<dyn SerialOpener>,
        engine: Arc<PresenceEngine>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            settings: SerialSettings::from_config(&config),
            config,
            opener,
            engine,
            status: RwLock::new(LinkStatus::default()),
            cancel,
        }
    }

    /// Run until cancelled, reconnecting forever
    pub async fn run(&self) {
        let mut retry = Reconnect::new(&self.config.timing);

        loop {
            let reason = match self.connect_once().await {
                Some(reason) => reason,
                None => break,
            };

            if !retry.wait(reason, &self.cancel).await {
                break;
            }
            self.status.write().await.reconnects = retry.attempts();
        }

        self.status.write().await.state = LinkState::Disabled;
        tracing::info!("Sensor link stopped");
    }

    /// Stop the link; the display policy keeps running
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn snapshot(&self) -> LinkSnapshot {
        let status = self.status.read().await;
        let port = status.active_port.as_ref().unwrap_or(&self.config.port);

        LinkSnapshot {
            connection_status: status.state,
            port: port.display().to_string(),
            bytes_received: status.bytes_received,
            frames_received: status.frames_received,
            frames_dropped: status.frames_dropped,
            noise_bytes: status.noise_bytes,
            decode_errors: status.decode_errors,
            reconnects: status.reconnects,
            last_error: status.last_error.clone(),
        }
    }

    /// One connection attempt; `None` means cancelled
    async fn connect_once(&self) -> Option<RetryReason> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.set_state(LinkState::Connecting, None).await;

        // Probing paths and reading boot configs touches the filesystem
        let config = self.config.clone();
        let discovered = tokio::task::spawn_blocking(move || discovery::discover(&config)).await;
        let path = match discovered {
            Ok(Ok(path)) => path,
            Ok(Err(e)) => {
                tracing::warn!("Sensor discovery failed: {}", e);
                self.set_state(LinkState::Disconnected, Some(e.to_string())).await;
                return Some(RetryReason::NoDevice);
            }
            Err(e) => {
                tracing::error!("Sensor discovery task failed: {}", e);
                self.set_state(LinkState::Error, Some(e.to_string())).await;
                return Some(RetryReason::NoDevice);
            }
        };

        let opened = tokio::select! {
            _ = self.cancel.cancelled() => return None,
            opened = self.opener.open(&path, &self.settings) => opened,
        };
        let conn = match opened {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!("Failed to open {}: {}", path.display(), e);
                self.set_state(LinkState::Error, Some(e.to_string())).await;
                return Some(RetryReason::LinkLost);
            }
        };

        {
            let mut status = self.status.write().await;
            status.state = LinkState::Connected;
            status.active_port = Some(path.clone());
            status.last_error = None;
            status.bytes_received = 0;
            status.frames_received = 0;
            status.frames_dropped = 0;
            status.noise_bytes = 0;
            status.decode_errors = 0;
        }
        tracing::info!("Sensor connected on {}", path.display());

        let handshake = self.spawn_handshake(conn.writer);

        let outcome = self.pump(conn.events).await;

        handshake.abort();
        self.status.write().await.active_port = None;
        outcome
    }

    fn spawn_handshake(&self, writer: Box<dyn FrameWriter>) -> JoinHandle<()> {
        let sensitivity = self.config.sensitivity;
        let timing = self.config.timing.clone();
        tokio::spawn(async move {
            if let Err(e) = handshake::run(writer, sensitivity, timing).await {
                tracing::warn!("Sensor configuration failed: {}", e);
            }
        })
    }

    /// Consume reader events until the connection ends
    async fn pump(&self, mut events: mpsc::Receiver<LinkEvent>) -> Option<RetryReason> {
        let mut reassembler = FrameReassembler::for_reports();

        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => return None,
                event = events.recv() => event,
            };

            match event {
                Some(LinkEvent::Data(bytes)) => self.ingest(&mut reassembler, bytes).await,
                Some(LinkEvent::Error(msg)) => {
                    tracing::warn!("Serial read error: {}", msg);
                    self.set_state(LinkState::Error, Some(msg)).await;
                    return Some(RetryReason::LinkLost);
                }
                Some(LinkEvent::Closed) | None => {
                    tracing::warn!("Serial device closed");
                    self.set_state(LinkState::Disconnected, Some("device closed".to_string()))
                        .await;
                    return Some(RetryReason::LinkLost);
                }
            }
        }
    }

    /// Reassemble and decode one chunk, then hand reports to the engine
    async fn ingest(&self, reassembler: &mut FrameReassembler, bytes: Bytes) {
        reassembler.push(&bytes);

        let mut reports: Vec<ReportFrame> = Vec::new();
        let mut decode_errors = 0u64;
        for body in reassembler.drain() {
            match FrameCodec::decode_report(&body) {
                Ok(report) => reports.push(report),
                Err(e) => {
                    tracing::debug!("Discarding report: {}", e);
                    decode_errors += 1;
                }
            }
        }

        {
            let mut status = self.status.write().await;
            status.bytes_received += bytes.len() as u64;
            status.frames_received += reports.len() as u64;
            status.decode_errors += decode_errors;
            status.frames_dropped = reassembler.stats().dropped;
            status.noise_bytes = reassembler.stats().noise_bytes;
        }
        tracing::trace!("Received {} bytes, {} reports", bytes.len(), reports.len());

        for report in &reports {
            self.engine.on_report(report).await;
        }
    }

    async fn set_state(&self, state: LinkState, error: Option<String>) {
        let mut status = self.status.write().await;
        if status.state != state {
            tracing::debug!("Link {} -> {}", status.state, state);
        }
        status.state = state;
        if let Some(error) = error {
            status.last_error = Some(error);
        }
    }
}
