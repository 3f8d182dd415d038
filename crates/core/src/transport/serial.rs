//! Native serial devices via the `serialport` crate
//!
//! `serialport` reads are blocking, so each connection gets a reader on the
//! blocking pool that forwards chunks into an `EventStream`.

use async_trait::async_trait;
use bytes::Bytes;
use serialport::SerialPort;
use std::io::{Read, Write};
use std::path::Path;

use super::{FrameWriter, SerialConnection, SerialOpener, SerialSettings};
use crate::streaming::{EventStream, LinkEvent};
use crate::{CoreError, Result};

/// Events buffered between the reader thread and the link
const EVENT_CAPACITY: usize = 256;

/// Size of a single blocking read
const READ_CHUNK: usize = 512;

/// Opens real serial devices
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeSerialOpener;

#[async_trait]
impl SerialOpener for NativeSerialOpener {
    async fn open(&self, path: &Path, settings: &SerialSettings) -> Result<SerialConnection> {
        let name = path.to_string_lossy().into_owned();
        let baud_rate = settings.baud_rate;
        let settings = settings.clone();

        let open_name = name.clone();
        let port = tokio::task::spawn_blocking(move || {
            serialport::new(&open_name, settings.baud_rate)
                .data_bits(settings.data_bits)
                .parity(settings.parity)
                .stop_bits(settings.stop_bits)
                .timeout(settings.read_timeout)
                .open()
        })
        .await
        .map_err(|e| CoreError::Serial(format!("open task failed: {}", e)))??;

        let reader = port.try_clone()?;
        let (stream, events) = EventStream::new(EVENT_CAPACITY);
        spawn_reader(reader, stream, name.clone());

        tracing::info!("Opened {} at {} baud", name, baud_rate);
        Ok(SerialConnection {
            writer: Box::new(SerialWriter { port }),
            events,
        })
    }
}

struct SerialWriter {
    port: Box<dyn SerialPort>,
}

impl FrameWriter for SerialWriter {
    fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()> {
        self.port.write_all(frame)?;
        self.port.flush()
    }
}

/// Blocking reader: forwards chunks until error, EOF, or the link hangs up
fn spawn_reader(mut port: Box<dyn SerialPort>, stream: EventStream, name: String) {
    let reader_name = name.clone();
    let reader = tokio::task::spawn_blocking(move || {
        let mut buf = [0u8; READ_CHUNK];

        loop {
            if stream.is_closed() {
                tracing::debug!("Link dropped reader for {}", reader_name);
                break;
            }

            let event = match port.read(&mut buf) {
                Ok(0) => LinkEvent::Closed,
                Ok(n) => {
                    tracing::trace!("Read {} bytes from {}", n, reader_name);
                    LinkEvent::Data(Bytes::copy_from_slice(&buf[..n]))
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => LinkEvent::Error(e.to_string()),
            };

            let terminal = !matches!(event, LinkEvent::Data(_));
            if stream.blocking_send(event).is_err() || terminal {
                break;
            }
        }
    });

    tokio::spawn(async move {
        if let Err(e) = reader.await {
            tracing::error!("Serial reader for {} panicked: {}", name, e);
        }
    });
}
