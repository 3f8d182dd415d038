//! Display power control
//!
//! Requests flow from the presence engine through an unbounded channel to a
//! single worker, so the read loop never waits on an OS command and concurrent
//! requests cannot double-toggle. Each applied change:
//! 1. notifies UI subscribers (software dim/brighten, best effort)
//! 2. runs the primary power command
//! 3. runs the fallback command if the primary failed
//!
//! Failures are logged and never reach the presence engine.

pub mod command;

pub use command::CommandDisplayPower;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::types::DisplayEvent;
use crate::{CoreError, Result};

/// UI event buffer per subscriber
const EVENT_CAPACITY: usize = 16;

/// Something that can switch the physical display
#[async_trait]
pub trait DisplayPower: Send + Sync {
    async fn set_power(&self, on: bool) -> Result<()>;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Backend that only logs; for machines without display control
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlyPower;

#[async_trait]
impl DisplayPower for LogOnlyPower {
    async fn set_power(&self, on: bool) -> Result<()> {
        tracing::info!("Display power {} (display control disabled)", on_off(on));
        Ok(())
    }

    fn name(&self) -> &str {
        "log-only"
    }
}

/// Sending half used by the presence engine
#[derive(Clone, Debug)]
pub struct DisplayHandle {
    tx: mpsc::UnboundedSender<bool>,
}

impl DisplayHandle {
    /// Queue a power change
    pub fn request(&self, on: bool) -> Result<()> {
        self.tx.send(on).map_err(|_| CoreError::ChannelClosed)
    }
}

/// Receiving half consumed by [`DisplayController::run`]
pub type DisplayRequests = mpsc::UnboundedReceiver<bool>;

/// Create a request channel
pub fn channel() -> (DisplayHandle, DisplayRequests) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DisplayHandle { tx }, rx)
}

/// Applies display power changes idempotently
pub struct DisplayController {
    primary: Arc<dyn DisplayPower>,
    fallback: Option<Arc<dyn DisplayPower>>,
    events: broadcast::Sender<DisplayEvent>,
    /// Last applied state; held across the side effects of a change
    current: Mutex<bool>,
}

impl DisplayController {
    /// `initially_on` is the state the display is assumed to be in at startup
    pub fn new(
        primary: Arc<dyn DisplayPower>,
        fallback: Option<Arc<dyn DisplayPower>>,
        initially_on: bool,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            primary,
            fallback,
            events,
            current: Mutex::new(initially_on),
        }
    }

    /// Subscribe to UI notifications
    pub fn subscribe(&self) -> broadcast::Receiver<DisplayEvent> {
        self.events.subscribe()
    }

    /// Switch the display; no-op if already in the requested state
    ///
    /// Returns `true` if a change was applied.
    pub async fn set_display(&self, on: bool) -> bool {
        let mut current = self.current.lock().await;
        if *current == on {
            tracing::trace!("Display already {}", on_off(on));
            return false;
        }
        *current = on;

        tracing::info!("Turning display {}", on_off(on));

        // No subscribers is fine
        let _ = self.events.send(DisplayEvent::for_power(on));

        self.apply_power(on).await;
        true
    }

    /// Turn the display back on if it is off; used at shutdown
    pub async fn restore_on(&self) -> bool {
        let restored = self.set_display(true).await;
        if restored {
            tracing::info!("Display restored before exit");
        }
        restored
    }

    /// Apply queued requests until cancelled, then make sure the display is on
    pub async fn run(self: Arc<Self>, mut requests: DisplayRequests, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                request = requests.recv() => match request {
                    Some(on) => {
                        self.set_display(on).await;
                    }
                    None => break,
                },
            }
        }

        self.restore_on().await;
    }

    async fn apply_power(&self, on: bool) {
        let err = match self.primary.set_power(on).await {
            Ok(()) => return,
            Err(e) => e,
        };
        tracing::warn!("{} failed: {}", self.primary.name(), err);

        if let Some(fallback) = &self.fallback {
            match fallback.set_power(on).await {
                Ok(()) => tracing::info!("Display {} via {}", on_off(on), fallback.name()),
                Err(e) => tracing::warn!("{} failed: {}", fallback.name(), e),
            }
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}
