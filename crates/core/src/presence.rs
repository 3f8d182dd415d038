//! Presence tracking and display policy
//!
//! Presence wakes the display immediately; absence only turns it off after
//! the off-delay has elapsed, checked on a fixed tick. All state lives behind
//! one mutex and display requests are queued while it is held, so a report
//! and a tick can never interleave or reorder their requests.

use serde::Serialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::SensorConfig;
use crate::display::DisplayHandle;
use crate::types::ReportFrame;

/// Mutable presence state
#[derive(Debug, Clone, Copy)]
pub struct PresenceState {
    pub is_present: bool,
    pub last_presence_at: Instant,
    pub display_on: bool,
    pub disabled: bool,
}

/// Copy of the presence state for status reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSnapshot {
    pub present: bool,
    /// Last presence as unix epoch milliseconds
    pub last_presence: u64,
    pub display_on: bool,
    pub seconds_since_presence: u64,
    pub disabled: bool,
}

pub struct PresenceEngine {
    off_delay: Duration,
    tick_period: Duration,
    display: DisplayHandle,
    state: Mutex<PresenceState>,
    /// Pairs monotonic time with wall time for epoch reporting
    started_at: Instant,
    started_wall: SystemTime,
}

impl PresenceEngine {
    pub fn new(config: &SensorConfig, display: DisplayHandle) -> Self {
        let now = Instant::now();
        Self {
            off_delay: config.off_delay,
            tick_period: config.timing.tick,
            display,
            state: Mutex::new(PresenceState {
                is_present: false,
                last_presence_at: now,
                display_on: true,
                disabled: false,
            }),
            started_at: now,
            started_wall: SystemTime::now(),
        }
    }

    /// Apply a decoded report
    pub async fn on_report(&self, frame: &ReportFrame) {
        let mut state = self.state.lock().await;

        if !frame.is_present() {
            if state.is_present {
                tracing::debug!("Target left ({:?})", frame.target_status);
            }
            state.is_present = false;
            return;
        }

        if !state.is_present {
            tracing::debug!(
                "Target detected ({:?}, motion {} cm, static {} cm)",
                frame.target_status,
                frame.motion_distance_cm,
                frame.static_distance_cm
            );
        }
        state.is_present = true;
        state.last_presence_at = Instant::now();

        if !state.display_on {
            tracing::info!("Presence detected, waking display");
            self.request_display(&mut state, true);
        }
    }

    /// Periodic off-delay check; returns `true` if the display was turned off
    pub async fn tick(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.disabled || !state.display_on {
            return false;
        }

        let absent_for = state.last_presence_at.elapsed();
        if absent_for <= self.off_delay {
            return false;
        }

        tracing::info!(
            "No presence for {}s (off-delay {}s), display off",
            absent_for.as_secs(),
            self.off_delay.as_secs()
        );
        self.request_display(&mut state, false);
        true
    }

    /// Manual presence, as if a target had just been seen
    pub async fn trigger(&self) -> PresenceSnapshot {
        let mut state = self.state.lock().await;
        tracing::info!("Manual presence trigger");

        state.is_present = true;
        state.last_presence_at = Instant::now();
        if !state.display_on {
            self.request_display(&mut state, true);
        }
        self.snapshot_of(&state)
    }

    /// Stop managing the display and leave it on
    pub async fn disable(&self) -> PresenceSnapshot {
        let mut state = self.state.lock().await;
        if !state.disabled {
            tracing::info!("Presence control disabled, display forced on");
        }

        state.disabled = true;
        if !state.display_on {
            self.request_display(&mut state, true);
        }
        self.snapshot_of(&state)
    }

    pub async fn snapshot(&self) -> PresenceSnapshot {
        let state = self.state.lock().await;
        self.snapshot_of(&state)
    }

    /// Call [`tick`](Self::tick) on a fixed period until cancelled
    pub async fn run_ticker(&self, cancel: CancellationToken) {
        let mut ticker = interval(self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick fires immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Presence ticker stopped");
                    return;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    fn request_display(&self, state: &mut PresenceState, on: bool) {
        state.display_on = on;
        if let Err(e) = self.display.request(on) {
            tracing::warn!("Display request dropped: {}", e);
        }
    }

    fn snapshot_of(&self, state: &PresenceState) -> PresenceSnapshot {
        let offset = state.last_presence_at.saturating_duration_since(self.started_at);
        let last_presence = (self.started_wall + offset)
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        PresenceSnapshot {
            present: state.is_present,
            last_presence,
            display_on: state.display_on,
            seconds_since_presence: state.last_presence_at.elapsed().as_secs(),
            disabled: state.disabled,
        }
    }
}
