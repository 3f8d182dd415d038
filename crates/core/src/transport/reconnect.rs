//! Fixed-delay retry scheduling for the sensor link
//!
//! The sensor link never gives up: it waits a fixed delay and tries again,
//! forever, until cancelled. Two delays exist because "no device at all" is
//! usually an operator problem and is rechecked less often than a dropped
//! connection.

use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::config::Timing;

/// Why the link is waiting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// Discovery found no device
    NoDevice,
    /// Open failed, read failed or the device closed
    LinkLost,
}

/// Retry scheduler
#[derive(Debug, Clone)]
pub struct Reconnect {
    reconnect_delay: Duration,
    discovery_retry: Duration,
    attempts: u64,
}

impl Reconnect {
    pub fn new(timing: &Timing) -> Self {
        Self {
            reconnect_delay: timing.reconnect_delay,
            discovery_retry: timing.discovery_retry,
            attempts: 0,
        }
    }

    pub fn delay_for(&self, reason: RetryReason) -> Duration {
        match reason {
            RetryReason::NoDevice => self.discovery_retry,
            RetryReason::LinkLost => self.reconnect_delay,
        }
    }

    /// Sleep before the next attempt
    ///
    /// Returns `false` if `cancel` fired while waiting.
    pub async fn wait(&mut self, reason: RetryReason, cancel: &CancellationToken) -> bool {
        self.attempts += 1;
        let delay = self.delay_for(reason);
        tracing::info!(
            "Retrying sensor link in {:?} ({:?}, attempt {})",
            delay,
            reason,
            self.attempts
        );

        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = sleep(delay) => true,
        }
    }

    /// Number of waits so far
    pub fn attempts(&self) -> u64 {
        self.attempts
    }
}
