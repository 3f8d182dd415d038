//! Channel-based serial event streaming with zero-copy bytes
//!
//! A serial device produces three kinds of events: data, a read error, or a
//! close. Instead of three callbacks, one reader per connection pushes a
//! `LinkEvent` into a bounded channel consumed by the link's read loop.

use bytes::Bytes;
use tokio::sync::mpsc;

/// Event produced by a serial reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Raw bytes as read from the device
    Data(Bytes),
    /// Read failed; the connection is unusable
    Error(String),
    /// Device closed (EOF or unplugged)
    Closed,
}

/// Bounded channel carrying `LinkEvent`s from a reader to the link
///
/// Channel capacity creates natural backpressure when the consumer lags.
pub struct EventStream {
    tx: mpsc::Sender<LinkEvent>,
}

impl EventStream {
    /// Create new stream with specified buffer capacity
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<LinkEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Send from a blocking reader thread
    ///
    /// Must not be called from inside the async runtime.
    pub fn blocking_send(&self, event: LinkEvent) -> Result<(), mpsc::error::SendError<LinkEvent>> {
        self.tx.blocking_send(event)
    }

    /// True once the consumer dropped its receiver
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
